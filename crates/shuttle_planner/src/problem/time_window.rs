use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: Timestamp,
    end: Timestamp,
}

impl TimeWindow {
    pub fn new(start: Timestamp, end: Timestamp) -> Self {
        TimeWindow { start, end }
    }

    pub fn from_iso(start: &str, end: &str) -> Result<Self, jiff::Error> {
        Ok(TimeWindow {
            start: start.parse()?,
            end: end.parse()?,
        })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    pub fn duration(&self) -> SignedDuration {
        self.end.duration_since(self.start)
    }

    /// Closed-interval intersection: a window ending exactly when another
    /// starts still overlaps it.
    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps() {
        let morning = TimeWindow::from_iso("2025-06-10T08:00:00Z", "2025-06-10T12:00:00Z").unwrap();
        let noon = TimeWindow::from_iso("2025-06-10T12:00:00Z", "2025-06-10T16:00:00Z").unwrap();
        let evening =
            TimeWindow::from_iso("2025-06-10T16:30:00Z", "2025-06-10T20:00:00Z").unwrap();
        let inside = TimeWindow::from_iso("2025-06-10T09:00:00Z", "2025-06-10T10:00:00Z").unwrap();

        assert!(morning.overlaps(&noon));
        assert!(noon.overlaps(&morning));
        assert!(morning.overlaps(&inside));
        assert!(inside.overlaps(&morning));
        assert!(!morning.overlaps(&evening));
        assert!(!evening.overlaps(&noon));
    }

    #[test]
    fn test_duration() {
        let window = TimeWindow::from_iso("2025-06-10T08:00:00Z", "2025-06-10T10:30:00Z").unwrap();
        assert_eq!(window.duration(), SignedDuration::from_mins(150));
    }
}
