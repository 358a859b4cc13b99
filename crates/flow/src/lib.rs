//! Booking-to-ticket pipeline: stamping bookings, deriving tickets and
//! deciding which data each view shows.

use std::sync::Arc;

use anyhow::{Result, bail};
use busticket_store::Store;
use chrono::format::{Item, StrftimeItems};
use chrono_tz::Tz;

mod builder;
mod deriver;
pub mod env;
mod hydrator;

pub use env::{Clock, IdSource, SystemClock, ThreadRngIds};
pub use hydrator::{ENTRY_ROUTE, QrNavigation, Source, TicketView, ViewState};

/// Timezone booking times are rendered in unless configured otherwise.
pub const DEFAULT_TIMEZONE: Tz = chrono_tz::Asia::Kolkata;

/// `Date.toLocaleString()`-style timestamp, e.g. `6/19/2025, 4:46:12 PM`.
pub const DEFAULT_TIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

#[derive(Debug, Clone)]
pub struct BookingFlow {
    store: Store,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdSource>,
    timezone: Tz,
    time_format: String,
}

impl BookingFlow {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            ids: Arc::new(ThreadRngIds),
            timezone: DEFAULT_TIMEZONE,
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Render booking times in `timezone` using a strftime-style `format`.
    pub fn with_time_format(mut self, timezone: Tz, format: &str) -> Result<Self> {
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            bail!("invalid booking time format: {format:?}");
        }
        self.timezone = timezone;
        self.time_format = format.to_string();
        Ok(self)
    }

    pub fn store(&self) -> &Store {
        &self.store
    }
}
