use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, JsonSchema, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMethod {
    /// Great-circle distance over `(lat, lon)` coordinates.
    #[default]
    Haversine,
    /// Planar distance, coordinates are taken as cartesian `x`/`y`.
    Euclidean,
}

impl std::str::FromStr for DistanceMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "haversine" => Ok(DistanceMethod::Haversine),
            "euclidean" | "planar" => Ok(DistanceMethod::Euclidean),
            other => Err(format!("unknown distance method '{other}'")),
        }
    }
}
