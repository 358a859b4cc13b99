use serde::{Deserialize, Serialize};
use thiserror::Error;

mod payload;

pub use payload::QrPayload;

/// Prefix stamped on every ticket number.
pub const TICKET_PREFIX: &str = "DL51EV";

/// Multiplier applied to the fare to get the price actually charged.
pub const FINAL_PRICE_FACTOR: f64 = 0.9145;

/// Largest ticket count the booking form offers.
pub const MAX_TICKETS: u32 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub from: String,
    pub to: String,
    pub route: String,
    pub tickets: u32,
    pub fare: f64,
}

/// A submitted booking together with the time it was submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRecord {
    pub booking_data: Booking,
    pub booking_time: String,
}

impl BookingRecord {
    /// Built-in record shown by the ticket view when nothing else is available.
    pub fn sample() -> Self {
        Self {
            booking_data: Booking {
                from: "Khampur Village".to_string(),
                to: "Narela Terminal".to_string(),
                route: "120".to_string(),
                tickets: 1,
                fare: 20.0,
            },
            booking_time: "19 Jun, 25 | 04:46 PM".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub booking_data: Booking,
    pub booking_time: String,
    pub ticket_number: String,
    pub transaction_id: String,
    pub fare: f64,
    pub final_price: f64,
}

/// Ticket as read back from storage. Every field may be missing; missing
/// values are carried through to the QR payload as `null`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredTicket {
    pub booking_data: Option<StoredBooking>,
    pub booking_time: Option<String>,
    pub ticket_number: Option<String>,
    pub transaction_id: Option<String>,
    pub fare: Option<f64>,
    pub final_price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoredBooking {
    pub from: Option<String>,
    pub to: Option<String>,
    pub route: Option<String>,
    pub tickets: Option<u32>,
    pub fare: Option<f64>,
}

/// Booking record as read back from storage, tolerating missing fields.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoredBookingRecord {
    pub booking_data: Option<StoredBooking>,
    pub booking_time: Option<String>,
}

impl From<StoredBookingRecord> for BookingRecord {
    /// Missing text becomes empty, a missing ticket count 0 and a missing
    /// fare NaN, so a damaged record still yields the user's trip.
    fn from(stored: StoredBookingRecord) -> Self {
        let booking = stored.booking_data.unwrap_or_default();
        Self {
            booking_data: Booking {
                from: booking.from.unwrap_or_default(),
                to: booking.to.unwrap_or_default(),
                route: booking.route.unwrap_or_default(),
                tickets: booking.tickets.unwrap_or_default(),
                fare: booking.fare.unwrap_or(f64::NAN),
            },
            booking_time: stored.booking_time.unwrap_or_default(),
        }
    }
}

// --- Booking form ---

/// In-progress booking form values. Persisted between runs so a half-filled
/// form survives a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingDraft {
    pub from: String,
    pub to: String,
    pub route: String,
    pub tickets: u32,
    pub fare: f64,
}

impl Default for BookingDraft {
    fn default() -> Self {
        Self {
            from: String::new(),
            to: String::new(),
            route: String::new(),
            tickets: 1,
            fare: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BookingError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("ticket count must be between 1 and {MAX_TICKETS}, got {0}")]
    TicketsOutOfRange(u32),

    #[error("fare must be at least 1, got {0}")]
    FareTooLow(f64),
}

impl BookingDraft {
    /// Apply the form constraints and produce a submittable booking.
    pub fn validate(&self) -> Result<Booking, BookingError> {
        let from = required("from", &self.from)?;
        let to = required("to", &self.to)?;
        let route = required("route", &self.route)?;

        if !(1..=MAX_TICKETS).contains(&self.tickets) {
            return Err(BookingError::TicketsOutOfRange(self.tickets));
        }
        // NaN fails this comparison too.
        if !(self.fare.is_finite() && self.fare >= 1.0) {
            return Err(BookingError::FareTooLow(self.fare));
        }

        Ok(Booking {
            from,
            to,
            route,
            tickets: self.tickets,
            fare: self.fare,
        })
    }
}

fn required(field: &'static str, value: &str) -> Result<String, BookingError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(BookingError::MissingField(field))
    } else {
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    fn draft() -> BookingDraft {
        BookingDraft {
            from: "A".to_string(),
            to: "B".to_string(),
            route: "12".to_string(),
            tickets: 2,
            fare: 50.0,
        }
    }

    #[test]
    fn valid_draft_becomes_booking() -> TestResult {
        let booking = draft().validate()?;

        assert_eq!(booking.from, "A");
        assert_eq!(booking.tickets, 2);
        assert_eq!(booking.fare, 50.0);
        Ok(())
    }

    #[test]
    fn blank_fields_are_rejected() {
        let mut d = draft();
        d.route = "   ".to_string();

        assert_eq!(d.validate(), Err(BookingError::MissingField("route")));
    }

    #[test]
    fn ticket_count_is_bounded_by_form_range() {
        let mut d = draft();
        d.tickets = 0;
        assert_eq!(d.validate(), Err(BookingError::TicketsOutOfRange(0)));

        d.tickets = MAX_TICKETS + 1;
        assert!(d.validate().is_err());
    }

    #[test]
    fn fare_below_one_or_nan_is_rejected() {
        let mut d = draft();
        d.fare = 0.5;
        assert!(matches!(d.validate(), Err(BookingError::FareTooLow(_))));

        d.fare = f64::NAN;
        assert!(matches!(d.validate(), Err(BookingError::FareTooLow(_))));
    }

    #[test]
    fn partial_draft_fills_form_defaults() -> TestResult {
        let d: BookingDraft = serde_json::from_value(json!({ "from": "Narela" }))?;

        assert_eq!(d.from, "Narela");
        assert_eq!(d.tickets, 1);
        assert_eq!(d.fare, 20.0);
        Ok(())
    }

    #[test]
    fn ticket_uses_camel_case_keys() -> TestResult {
        let ticket = Ticket {
            booking_data: draft().validate()?,
            booking_time: "t".to_string(),
            ticket_number: "DL51EV1".to_string(),
            transaction_id: "T1".to_string(),
            fare: 50.0,
            final_price: 45.725,
        };

        let value = serde_json::to_value(&ticket)?;
        assert_eq!(value["bookingData"]["route"], "12");
        assert_eq!(value["ticketNumber"], "DL51EV1");
        assert_eq!(value["finalPrice"], 45.725);
        Ok(())
    }

    #[test]
    fn stored_booking_without_fare_keeps_the_trip() -> TestResult {
        let stored: StoredBookingRecord = serde_json::from_value(json!({
            "bookingData": { "from": "X", "to": "Y", "route": "9", "tickets": 1 },
            "bookingTime": "t"
        }))?;

        let record = BookingRecord::from(stored);

        assert_eq!(record.booking_data.route, "9");
        assert_eq!(record.booking_data.from, "X");
        assert_eq!(record.booking_time, "t");
        assert!(record.booking_data.fare.is_nan());
        Ok(())
    }

    #[test]
    fn stored_ticket_tolerates_missing_fields() -> TestResult {
        let stored: StoredTicket = serde_json::from_value(json!({
            "ticketNumber": "DL51EV42",
            "bookingData": { "route": "9" }
        }))?;

        assert_eq!(stored.ticket_number.as_deref(), Some("DL51EV42"));
        assert_eq!(stored.transaction_id, None);
        assert_eq!(stored.booking_data.and_then(|b| b.route).as_deref(), Some("9"));
        Ok(())
    }
}
