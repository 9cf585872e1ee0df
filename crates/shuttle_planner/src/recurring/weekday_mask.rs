use std::{fmt::Display, str::FromStr};

use jiff::civil::Weekday;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown weekday {0:?}, expected one of mon, tue, wed, thu, fri, sat, sun")]
pub struct UnknownWeekday(pub String);

/// Set of weekdays recurring routes run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WeekdayMask(u8);

impl WeekdayMask {
    pub const NONE: WeekdayMask = WeekdayMask(0);
    pub const EVERY_DAY: WeekdayMask = WeekdayMask(0b111_1111);

    fn bit(weekday: Weekday) -> u8 {
        1 << (weekday.to_monday_zero_offset() as u8)
    }

    pub fn with(self, weekday: Weekday) -> Self {
        WeekdayMask(self.0 | Self::bit(weekday))
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        self.0 & Self::bit(weekday) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Weekday> for WeekdayMask {
    fn from_iter<T: IntoIterator<Item = Weekday>>(iter: T) -> Self {
        iter.into_iter().fold(WeekdayMask::NONE, WeekdayMask::with)
    }
}

/// Monday to Friday.
impl Default for WeekdayMask {
    fn default() -> Self {
        [
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
        ]
        .into_iter()
        .collect()
    }
}

fn parse_weekday(s: &str) -> Result<Weekday, UnknownWeekday> {
    match s.trim().to_ascii_lowercase().as_str() {
        "mon" | "monday" => Ok(Weekday::Monday),
        "tue" | "tuesday" => Ok(Weekday::Tuesday),
        "wed" | "wednesday" => Ok(Weekday::Wednesday),
        "thu" | "thursday" => Ok(Weekday::Thursday),
        "fri" | "friday" => Ok(Weekday::Friday),
        "sat" | "saturday" => Ok(Weekday::Saturday),
        "sun" | "sunday" => Ok(Weekday::Sunday),
        other => Err(UnknownWeekday(other.to_owned())),
    }
}

/// Parses a comma separated list such as `mon,wed,fri`.
impl FromStr for WeekdayMask {
    type Err = UnknownWeekday;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split(',')
            .filter(|part| !part.trim().is_empty())
            .map(parse_weekday)
            .collect()
    }
}

impl Display for WeekdayMask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const NAMES: [&str; 7] = ["mon", "tue", "wed", "thu", "fri", "sat", "sun"];
        let names = NAMES
            .iter()
            .enumerate()
            .filter(|(offset, _)| self.0 & (1 << offset) != 0)
            .map(|(_, name)| *name)
            .collect::<Vec<_>>();
        write!(f, "{}", names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_working_week() {
        let mask = WeekdayMask::default();

        assert!(mask.contains(Weekday::Monday));
        assert!(mask.contains(Weekday::Friday));
        assert!(!mask.contains(Weekday::Saturday));
        assert!(!mask.contains(Weekday::Sunday));
        assert_eq!(mask.to_string(), "mon,tue,wed,thu,fri");
    }

    #[test]
    fn test_parse() {
        let mask: WeekdayMask = "Mon, wed,saturday".parse().unwrap();

        assert_eq!(mask.to_string(), "mon,wed,sat");
        assert_eq!(
            "mon,funday".parse::<WeekdayMask>(),
            Err(UnknownWeekday(String::from("funday")))
        );
        assert!("".parse::<WeekdayMask>().unwrap().is_empty());
    }
}
