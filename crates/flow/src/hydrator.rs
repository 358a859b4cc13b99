use busticket_models::{BookingRecord, QrPayload, StoredBookingRecord, StoredTicket, Ticket};
use busticket_store::Slot;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::BookingFlow;

/// Where a view is sent when it has nothing to show.
pub const ENTRY_ROUTE: &str = "/";

/// Where a view's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Navigation,
    Storage,
    Sample,
}

/// Lifecycle of a single view activation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ViewState<T> {
    #[default]
    AwaitingInput,
    Resolved {
        data: T,
        source: Source,
    },
    Redirect(&'static str),
}

impl<T> ViewState<T> {
    pub fn resolved(self) -> Option<T> {
        match self {
            ViewState::Resolved { data, .. } => Some(data),
            _ => None,
        }
    }
}

/// What the ticket view renders: the freshly derived ticket plus the payload
/// it hands to the QR view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    pub ticket: Ticket,
    pub qr_data: String,
}

/// State the ticket view passes along when opening the QR view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrNavigation {
    pub qr_data: String,
}

impl BookingFlow {
    /// Resolve the ticket view: navigation state, then the stored booking, then
    /// the built-in sample. A ticket is derived on every activation.
    ///
    /// A stored booking with missing fields still wins over the sample; the
    /// gaps carry through into the ticket.
    pub fn activate_ticket_view(&self, navigation: Option<BookingRecord>) -> ViewState<TicketView> {
        let (record, source) = match navigation {
            Some(record) => (record, Source::Navigation),
            None => match self.store.get::<StoredBookingRecord>(Slot::Booking) {
                Some(stored) => (BookingRecord::from(stored), Source::Storage),
                None => (BookingRecord::sample(), Source::Sample),
            },
        };
        debug!("Ticket view resolved from {source:?}");

        let ticket = self.derive(record);
        let qr_data = QrPayload::from(&ticket).encode();

        ViewState::Resolved {
            data: TicketView { ticket, qr_data },
            source,
        }
    }

    /// Resolve the QR payload string: navigation state, then a payload rebuilt
    /// from the stored ticket. Never derives a new ticket.
    pub fn activate_qr_view(&self, navigation: Option<QrNavigation>) -> ViewState<String> {
        if let Some(nav) = navigation.filter(|nav| !nav.qr_data.is_empty()) {
            debug!("QR view resolved from navigation");
            return ViewState::Resolved {
                data: nav.qr_data,
                source: Source::Navigation,
            };
        }

        match self.store.get::<StoredTicket>(Slot::Ticket) {
            Some(stored) => {
                debug!("QR view rebuilt from stored ticket");
                ViewState::Resolved {
                    data: QrPayload::from(&stored).encode(),
                    source: Source::Storage,
                }
            }
            None => {
                info!("No ticket to show, redirecting to {ENTRY_ROUTE}");
                ViewState::Redirect(ENTRY_ROUTE)
            }
        }
    }
}
