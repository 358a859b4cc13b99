use serde::{Serialize, Serializer};

use crate::{StoredTicket, Ticket};

/// The fields encoded into a ticket's QR image.
///
/// Field order here is the serialized key order; the renderer treats the
/// string as opaque bytes, so reordering fields changes every QR image.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub ticket_number: Option<String>,
    pub route: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    #[serde(serialize_with = "js_number")]
    pub fare: Option<f64>,
    pub tickets: Option<u32>,
    pub booking_time: Option<String>,
    pub transaction_id: Option<String>,
}

impl QrPayload {
    /// Canonical string handed to the QR renderer.
    pub fn encode(&self) -> String {
        // Only strings, numbers and nulls; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Largest integer an `f64` holds exactly (2^53).
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

/// Numbers as JavaScript prints them in JSON: whole values without a
/// fractional part, non-finite values as `null`.
fn js_number<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match *value {
        Some(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < MAX_EXACT_INTEGER => {
            serializer.serialize_i64(v as i64)
        }
        Some(v) if v.is_finite() => serializer.serialize_f64(v),
        _ => serializer.serialize_none(),
    }
}

impl From<&Ticket> for QrPayload {
    fn from(ticket: &Ticket) -> Self {
        Self {
            ticket_number: Some(ticket.ticket_number.clone()),
            route: Some(ticket.booking_data.route.clone()),
            from: Some(ticket.booking_data.from.clone()),
            to: Some(ticket.booking_data.to.clone()),
            fare: Some(ticket.fare),
            tickets: Some(ticket.booking_data.tickets),
            booking_time: Some(ticket.booking_time.clone()),
            transaction_id: Some(ticket.transaction_id.clone()),
        }
    }
}

impl From<&StoredTicket> for QrPayload {
    fn from(ticket: &StoredTicket) -> Self {
        let booking = ticket.booking_data.clone().unwrap_or_default();
        Self {
            ticket_number: ticket.ticket_number.clone(),
            route: booking.route,
            from: booking.from,
            to: booking.to,
            fare: ticket.fare,
            tickets: booking.tickets,
            booking_time: ticket.booking_time.clone(),
            transaction_id: ticket.transaction_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;
    use crate::Booking;

    #[test]
    fn keys_follow_canonical_order() -> TestResult {
        let stored: StoredTicket = serde_json::from_value(json!({
            "ticketNumber": "DL51EV42",
            "transactionId": "Tabc",
            "fare": 20,
            "bookingData": { "route": "9", "from": "X", "to": "Y", "tickets": 1 },
            "bookingTime": "t"
        }))?;

        let payload = QrPayload::from(&stored);

        assert_eq!(
            payload.encode(),
            r#"{"ticketNumber":"DL51EV42","route":"9","from":"X","to":"Y","fare":20,"tickets":1,"bookingTime":"t","transactionId":"Tabc"}"#
        );
        Ok(())
    }

    fn ticket(fare: f64) -> Ticket {
        Ticket {
            booking_data: Booking {
                from: "X".to_string(),
                to: "Y".to_string(),
                route: "9".to_string(),
                tickets: 1,
                fare,
            },
            booking_time: "t".to_string(),
            ticket_number: "DL51EV42".to_string(),
            transaction_id: "Tabc".to_string(),
            fare,
            final_price: fare * 0.9145,
        }
    }

    #[test]
    fn composing_the_same_ticket_twice_is_byte_identical() {
        let ticket = ticket(33.5);

        let first = QrPayload::from(&ticket).encode();
        let second = QrPayload::from(&ticket).encode();

        assert_eq!(first, second);
        assert_eq!(first, QrPayload::from(&ticket.clone()).encode());
    }

    #[test]
    fn fares_print_like_javascript_numbers() {
        assert!(QrPayload::from(&ticket(20.0)).encode().contains(r#""fare":20,"#));
        assert!(QrPayload::from(&ticket(-0.0)).encode().contains(r#""fare":0,"#));
        assert!(QrPayload::from(&ticket(20.5)).encode().contains(r#""fare":20.5,"#));
        assert!(QrPayload::from(&ticket(f64::NAN)).encode().contains(r#""fare":null,"#));
    }

    #[test]
    fn missing_values_serialize_as_null() {
        let payload = QrPayload::from(&StoredTicket {
            ticket_number: Some("DL51EV7".to_string()),
            ..StoredTicket::default()
        });

        let value: serde_json::Value = serde_json::from_str(&payload.encode()).unwrap_or_default();
        let object = value.as_object().cloned().unwrap_or_default();

        assert_eq!(object.len(), 8);
        assert_eq!(object["route"], serde_json::Value::Null);
        assert_eq!(object["transactionId"], serde_json::Value::Null);
    }
}
