use geo::{Distance, Euclidean, Haversine};
use serde::{Deserialize, Serialize};

use super::{distance_method::DistanceMethod, meters::Meters};

/// A geocoded point. Stored as a `geo::Point` with `x = longitude` and
/// `y = latitude` when built from coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Location {
    point: geo::Point,
}

impl Location {
    pub fn from_cartesian(x: f64, y: f64) -> Self {
        Self {
            point: geo::Point::new(x, y),
        }
    }

    pub fn from_lat_lon(lat: f64, lon: f64) -> Self {
        Self {
            point: geo::Point::new(lon, lat),
        }
    }

    pub fn x(&self) -> f64 {
        self.point.x()
    }

    pub fn y(&self) -> f64 {
        self.point.y()
    }

    pub fn lon(&self) -> f64 {
        self.point.x()
    }

    pub fn lat(&self) -> f64 {
        self.point.y()
    }

    pub fn euclidean_distance(&self, to: &Location) -> f64 {
        let euclidean = Euclidean;
        euclidean.distance(&self.point, &to.point)
    }

    pub fn haversine_distance(&self, to: &Location) -> f64 {
        let haversine = Haversine;

        haversine.distance(self.point, to.point)
    }

    pub fn distance(&self, to: &Location, method: DistanceMethod) -> Meters {
        match method {
            DistanceMethod::Haversine => Meters::new(self.haversine_distance(to)),
            DistanceMethod::Euclidean => Meters::new(self.euclidean_distance(to)),
        }
    }

    /// Arithmetic mean of the coordinates. Good enough as a centroid at
    /// city scale, which is what pickup clusters cover.
    pub fn centroid<'a, I>(locations: I) -> Option<Location>
    where
        I: IntoIterator<Item = &'a Location>,
    {
        let mut count = 0usize;
        let (mut sum_x, mut sum_y) = (0.0, 0.0);

        for location in locations {
            sum_x += location.x();
            sum_y += location.y();
            count += 1;
        }

        if count == 0 {
            return None;
        }

        Some(Location::from_cartesian(
            sum_x / count as f64,
            sum_y / count as f64,
        ))
    }
}

impl From<[f64; 2]> for Location {
    /// `[lat, lon]`, the order the employee directory stores coordinates in.
    fn from(value: [f64; 2]) -> Self {
        Location::from_lat_lon(value[0], value[1])
    }
}

impl From<Location> for [f64; 2] {
    fn from(value: Location) -> Self {
        [value.lat(), value.lon()]
    }
}

impl From<&Location> for geo::Point<f64> {
    fn from(location: &Location) -> Self {
        location.point
    }
}
