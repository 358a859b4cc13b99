use anyhow::Result;
use busticket_models::{Booking, BookingDraft, BookingRecord};
use busticket_store::Slot;
use tracing::info;

use crate::BookingFlow;

impl BookingFlow {
    /// Saved form values, or the empty form.
    pub fn load_draft(&self) -> BookingDraft {
        self.store.get(Slot::Draft).unwrap_or_default()
    }

    pub fn save_draft(&self, draft: &BookingDraft) -> Result<()> {
        self.store.put(Slot::Draft, draft)
    }

    /// Stamp `booking` with the current time and persist it.
    ///
    /// The booking is expected to have passed [`BookingDraft::validate`].
    pub fn submit(&self, booking: Booking) -> Result<BookingRecord> {
        let record = BookingRecord {
            booking_data: booking,
            booking_time: self.booking_time(),
        };
        self.store.put(Slot::Booking, &record)?;
        info!(
            "Booked {} ticket(s) on route {}: {} → {}",
            record.booking_data.tickets,
            record.booking_data.route,
            record.booking_data.from,
            record.booking_data.to,
        );
        Ok(record)
    }

    fn booking_time(&self) -> String {
        self.clock
            .now()
            .with_timezone(&self.timezone)
            .format(&self.time_format)
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use busticket_store::Store;
    use chrono::{TimeZone, Utc};
    use testresult::TestResult;

    use super::*;
    use crate::env::FixedClock;

    fn flow() -> BookingFlow {
        let noon = Utc.with_ymd_and_hms(2025, 6, 19, 11, 16, 12).unwrap();
        BookingFlow::new(Store::memory()).with_clock(FixedClock::new(noon))
    }

    fn booking() -> Booking {
        Booking {
            from: "A".to_string(),
            to: "B".to_string(),
            route: "12".to_string(),
            tickets: 2,
            fare: 50.0,
        }
    }

    #[test]
    fn submit_stamps_local_time() -> TestResult {
        let record = flow().submit(booking())?;

        assert_eq!(record.booking_time, "6/19/2025, 4:46:12 PM");
        assert_eq!(record.booking_data, booking());
        Ok(())
    }

    #[test]
    fn submit_persists_record() -> TestResult {
        let flow = flow();
        let record = flow.submit(booking())?;

        assert_eq!(flow.store().get(Slot::Booking), Some(record));
        Ok(())
    }

    #[test]
    fn custom_format_and_zone() -> TestResult {
        let flow = flow().with_time_format(chrono_tz::UTC, "%d %b, %y | %I:%M %p")?;

        let record = flow.submit(booking())?;

        assert_eq!(record.booking_time, "19 Jun, 25 | 11:16 AM");
        Ok(())
    }

    #[test]
    fn bad_format_is_rejected() {
        assert!(flow().with_time_format(chrono_tz::UTC, "%Q").is_err());
    }

    #[test]
    fn draft_defaults_until_saved() -> TestResult {
        let flow = flow();
        assert_eq!(flow.load_draft(), BookingDraft::default());

        let draft = BookingDraft {
            from: "Khampur".to_string(),
            ..BookingDraft::default()
        };
        flow.save_draft(&draft)?;

        assert_eq!(flow.load_draft(), draft);
        Ok(())
    }
}
