use std::{
    iter::Sum,
    ops::{Add, AddAssign, Div, Sub},
};

use jiff::SignedDuration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::kmh::Kmh;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, JsonSchema, Default)]
pub struct Meters(f64);

impl Meters {
    pub const ZERO: Meters = Meters(0.0);

    pub fn new(value: f64) -> Self {
        Meters(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0.0
    }

    pub fn squared(&self) -> f64 {
        self.0 * self.0
    }
}

impl Eq for Meters {}

impl PartialOrd for Meters {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Meters {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl From<f64> for Meters {
    fn from(value: f64) -> Self {
        Meters::new(value)
    }
}

impl Add for Meters {
    type Output = Meters;

    fn add(self, other: Meters) -> Meters {
        Meters(self.0 + other.0)
    }
}

impl AddAssign for Meters {
    fn add_assign(&mut self, other: Meters) {
        self.0 += other.0;
    }
}

impl Sub for Meters {
    type Output = Meters;

    fn sub(self, other: Meters) -> Meters {
        Meters(self.0 - other.0)
    }
}

impl Div<Kmh> for Meters {
    type Output = SignedDuration;

    fn div(self, speed: Kmh) -> SignedDuration {
        if speed.value() <= 0.0 {
            return SignedDuration::ZERO;
        }
        let seconds = self.0 * 3.6 / speed.value();
        SignedDuration::from_secs_f64(seconds)
    }
}

impl Sum for Meters {
    fn sum<I: Iterator<Item = Meters>>(iter: I) -> Meters {
        iter.fold(Meters::ZERO, |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_divide_by_speed() {
        let duration = Meters::new(30_000.0) / Kmh::new(30.0);
        assert_eq!(duration, SignedDuration::from_hours(1));
    }

    #[test]
    fn test_ordering_is_total() {
        let mut distances = vec![Meters::new(3.0), Meters::ZERO, Meters::new(1.5)];
        distances.sort();
        assert_eq!(
            distances,
            vec![Meters::ZERO, Meters::new(1.5), Meters::new(3.0)]
        );
    }
}
