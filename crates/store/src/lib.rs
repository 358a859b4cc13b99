use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Logical partitions of the store, each holding one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Last submitted booking record.
    Booking,
    /// Last derived ticket.
    Ticket,
    /// In-progress booking form values.
    Draft,
}

impl Slot {
    /// Fixed storage key for the slot.
    pub fn key(self) -> &'static str {
        match self {
            Slot::Booking => "busBookingData",
            Slot::Ticket => "busTicketData",
            Slot::Draft => "busBookingForm",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Raw string key-value backend.
pub trait Storage: Send + Sync + fmt::Debug {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Slot-level JSON store over an injected [`Storage`] backend.
///
/// Reads never fail: a missing slot, an unreadable backend and content that
/// does not parse as the requested type all come back as `None`.
#[derive(Debug, Clone)]
pub struct Store {
    backend: Arc<dyn Storage>,
}

impl Store {
    pub fn new(backend: impl Storage + 'static) -> Self {
        Self { backend: Arc::new(backend) }
    }

    /// Store backed by a directory of JSON files.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let storage = FileStorage::open(dir.as_ref())?;
        info!("Opened storage: {}", dir.as_ref().display());
        Ok(Self::new(storage))
    }

    pub fn memory() -> Self {
        Self::new(MemoryStorage::default())
    }

    /// Serialize `value` into `slot`, replacing whatever was there.
    pub fn put<T: Serialize>(&self, slot: Slot, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.backend.write(slot.key(), &json)?;
        debug!("Wrote slot {slot} ({} bytes)", json.len());
        Ok(())
    }

    pub fn get<T: DeserializeOwned>(&self, slot: Slot) -> Option<T> {
        let raw = match self.backend.read(slot.key()) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Error reading slot {slot}: {e:#}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring unreadable slot {slot}: {e}");
                None
            }
        }
    }

    /// Remove the booking and ticket slots. The draft is left alone.
    pub fn clear(&self) -> Result<()> {
        self.backend.remove(Slot::Booking.key())?;
        self.backend.remove(Slot::Ticket.key())?;
        info!("Cleared booking and ticket data");
        Ok(())
    }
}
