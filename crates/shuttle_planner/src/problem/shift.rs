use jiff::{
    civil::{Date, Time},
    tz::TimeZone,
};
use serde::{Deserialize, Serialize};

use crate::error::PlanningError;

use super::{
    ids::{OrganizationId, ShiftId},
    time_window::TimeWindow,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub start: Time,
    pub end: Time,
    /// IANA time zone name, e.g. `Africa/Addis_Ababa`.
    pub time_zone: String,
}

impl Shift {
    fn time_zone(&self) -> Result<TimeZone, PlanningError> {
        if self.time_zone.eq_ignore_ascii_case("utc") {
            return Ok(TimeZone::UTC);
        }

        TimeZone::get(&self.time_zone).map_err(|source| PlanningError::InvalidTimeZone {
            shift_id: self.id,
            source,
        })
    }

    /// Resolves the shift to concrete instants on `date`. A shift that does
    /// not end after it starts runs over midnight.
    pub fn window(&self, date: Date) -> Result<TimeWindow, PlanningError> {
        let tz = self.time_zone()?;
        let invalid = |source| PlanningError::InvalidTimeZone {
            shift_id: self.id,
            source,
        };

        let end_date = if self.end <= self.start {
            date.tomorrow().map_err(invalid)?
        } else {
            date
        };

        let start = date
            .to_datetime(self.start)
            .to_zoned(tz.clone())
            .map_err(invalid)?;
        let end = end_date
            .to_datetime(self.end)
            .to_zoned(tz)
            .map_err(invalid)?;

        Ok(TimeWindow::new(start.timestamp(), end.timestamp()))
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::{date, time};

    use super::*;

    fn shift(start: Time, end: Time) -> Shift {
        Shift {
            id: ShiftId::new(1),
            organization_id: OrganizationId::new(1),
            name: "Morning".to_owned(),
            start,
            end,
            time_zone: "UTC".to_owned(),
        }
    }

    #[test]
    fn test_window_same_day() {
        let window = shift(time(8, 0, 0, 0), time(16, 0, 0, 0))
            .window(date(2025, 6, 10))
            .unwrap();

        assert_eq!(
            window,
            TimeWindow::from_iso("2025-06-10T08:00:00Z", "2025-06-10T16:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_window_over_midnight() {
        let window = shift(time(22, 0, 0, 0), time(6, 0, 0, 0))
            .window(date(2025, 6, 10))
            .unwrap();

        assert_eq!(
            window,
            TimeWindow::from_iso("2025-06-10T22:00:00Z", "2025-06-11T06:00:00Z").unwrap()
        );
    }

    #[test]
    fn test_unknown_time_zone() {
        let mut shift = shift(time(8, 0, 0, 0), time(16, 0, 0, 0));
        shift.time_zone = "Mars/Olympus_Mons".to_owned();

        assert!(matches!(
            shift.window(date(2025, 6, 10)),
            Err(PlanningError::InvalidTimeZone { .. })
        ));
    }
}
