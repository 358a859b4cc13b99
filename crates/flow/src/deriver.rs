use busticket_models::{BookingRecord, FINAL_PRICE_FACTOR, TICKET_PREFIX, Ticket};
use busticket_store::Slot;
use tracing::{info, warn};

use crate::BookingFlow;

const TICKET_NUMBER_RANGE: u64 = 10_000;
const TRANSACTION_PART_RANGE: u64 = 1_000_000_000;

impl BookingFlow {
    /// Issue a ticket for `record` and persist it.
    ///
    /// Every call mints a fresh ticket number and transaction id, even for a
    /// record that was derived before.
    pub fn derive(&self, record: BookingRecord) -> Ticket {
        let ticket_number = format!("{TICKET_PREFIX}{}", self.ids.below(TICKET_NUMBER_RANGE));
        let transaction_id = format!(
            "T{:x}{:x}{:x}",
            self.ids.below(TRANSACTION_PART_RANGE),
            self.ids.below(TRANSACTION_PART_RANGE),
            self.clock.now().timestamp_millis(),
        );
        let fare = record.booking_data.fare;

        let ticket = Ticket {
            booking_data: record.booking_data,
            booking_time: record.booking_time,
            ticket_number,
            transaction_id,
            fare,
            final_price: fare * FINAL_PRICE_FACTOR,
        };

        if let Err(e) = self.store.put(Slot::Ticket, &ticket) {
            warn!("Could not save ticket {}: {e:#}", ticket.ticket_number);
        }
        info!("Issued ticket {} ({})", ticket.ticket_number, ticket.transaction_id);

        ticket
    }
}

#[cfg(test)]
mod tests {
    use busticket_models::Booking;
    use busticket_store::Store;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::env::{FixedClock, SequenceIds};

    fn record(fare: f64) -> BookingRecord {
        BookingRecord {
            booking_data: Booking {
                from: "A".to_string(),
                to: "B".to_string(),
                route: "12".to_string(),
                tickets: 2,
                fare,
            },
            booking_time: "t".to_string(),
        }
    }

    fn flow(ids: SequenceIds) -> BookingFlow {
        let clock = FixedClock::new(Utc.timestamp_millis_opt(0x18f_0000_0000).unwrap());
        BookingFlow::new(Store::memory()).with_clock(clock).with_ids(ids)
    }

    #[test]
    fn ids_follow_the_documented_shape() {
        let ticket = flow(SequenceIds::new([42, 255, 4096])).derive(record(50.0));

        assert_eq!(ticket.ticket_number, "DL51EV42");
        assert_eq!(ticket.transaction_id, "Tff100018f00000000");
    }

    #[test]
    fn ticket_number_stays_below_ten_thousand() {
        let ticket = flow(SequenceIds::new([123_456])).derive(record(50.0));

        assert_eq!(ticket.ticket_number, "DL51EV3456");
    }

    #[test]
    fn final_price_is_unrounded() {
        let ticket = flow(SequenceIds::default()).derive(record(50.0));

        assert_eq!(ticket.final_price, 45.725);
        assert_eq!(ticket.fare, 50.0);
        assert_eq!(ticket.booking_data.tickets, 2);

        let odd = flow(SequenceIds::default()).derive(record(33.33));
        assert_eq!(odd.final_price, 33.33 * 0.9145);
    }

    #[test]
    fn derived_ticket_is_persisted() {
        let flow = flow(SequenceIds::new([7]));

        let ticket = flow.derive(record(20.0));

        assert_eq!(flow.store().get(Slot::Ticket), Some(ticket));
    }

    #[test]
    fn rederiving_mints_a_new_ticket() {
        let flow = flow(SequenceIds::new([1, 2, 3, 4, 5, 6]));

        let first = flow.derive(record(20.0));
        let second = flow.derive(record(20.0));

        assert_ne!(first.ticket_number, second.ticket_number);
        assert_ne!(first.transaction_id, second.transaction_id);
    }
}
