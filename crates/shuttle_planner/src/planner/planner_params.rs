use jiff::SignedDuration;

use crate::problem::{distance_method::DistanceMethod, kmh::Kmh, location::Location};

/// Average shuttle speed used to turn route distance into travel time.
pub const DEFAULT_AVERAGE_SPEED_KMH: f64 = 30.0;

/// Time spent at every stop for employees to board.
pub const DEFAULT_STOP_DWELL: SignedDuration = SignedDuration::from_mins(2);

#[derive(Clone, Debug, PartialEq)]
pub enum ClusterCapacity {
    /// Size the k-th cluster for the k-th largest shuttle still eligible for
    /// the shift.
    EligibleFleet,
    Fixed(u32),
}

#[derive(Clone, Debug)]
pub struct PlannerParams {
    pub distance_method: DistanceMethod,
    pub average_speed: Kmh,
    pub stop_dwell: SignedDuration,

    pub cluster_capacity: ClusterCapacity,
    pub target_cluster_count: Option<usize>,

    /// Where the shuttles deliver employees to. When set, the leg from the
    /// last pickup to this point is part of the route totals.
    pub headquarters: Option<Location>,
}

impl Default for PlannerParams {
    fn default() -> Self {
        Self {
            distance_method: DistanceMethod::Haversine,
            average_speed: Kmh::new(DEFAULT_AVERAGE_SPEED_KMH),
            stop_dwell: DEFAULT_STOP_DWELL,
            cluster_capacity: ClusterCapacity::EligibleFleet,
            target_cluster_count: None,
            headquarters: None,
        }
    }
}
