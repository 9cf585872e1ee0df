use std::{fmt::Display, str::FromStr};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{
    ids::{DriverId, OrganizationId, RouteId, ShuttleId},
    time_window::TimeWindow,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShuttleStatus {
    Available,
    Maintenance,
    Inactive,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown shuttle status '{0}'")]
pub struct UnknownShuttleStatus(pub String);

impl FromStr for ShuttleStatus {
    type Err = UnknownShuttleStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(ShuttleStatus::Available),
            "maintenance" => Ok(ShuttleStatus::Maintenance),
            "inactive" => Ok(ShuttleStatus::Inactive),
            _ => Err(UnknownShuttleStatus(s.to_owned())),
        }
    }
}

impl Display for ShuttleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ShuttleStatus::Available => "available",
                ShuttleStatus::Maintenance => "maintenance",
                ShuttleStatus::Inactive => "inactive",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shuttle {
    pub id: ShuttleId,
    pub organization_id: OrganizationId,
    pub name: Option<String>,
    pub capacity: u32,
    pub status: ShuttleStatus,
    pub driver_id: Option<DriverId>,
}

impl Shuttle {
    pub fn is_available(&self) -> bool {
        self.status == ShuttleStatus::Available
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingKind {
    /// A non-completed, non-cancelled route already runs on the shuttle.
    Route(RouteId),
    /// The shuttle was explicitly marked unavailable.
    Unavailable,
}

/// An interval during which a shuttle cannot take another route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuttleBooking {
    pub shuttle_id: ShuttleId,
    pub window: TimeWindow,
    pub kind: BookingKind,
}
