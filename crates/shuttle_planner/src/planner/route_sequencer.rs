use fxhash::FxHashSet;
use jiff::SignedDuration;
use serde::Serialize;

use crate::{
    planner::{
        cluster_builder::{Cluster, ClusterMember},
        geo_index::GeoIndex,
        planner_params::PlannerParams,
    },
    problem::{
        distance_method::DistanceMethod, ids::EmployeeId, kmh::Kmh, location::Location,
        meters::Meters,
    },
};

/// A pickup point before it is sequenced or measured.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedStop {
    pub location: Location,
    pub name: Option<String>,
    pub employee_ids: Vec<EmployeeId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequencedStop {
    pub order: usize,
    pub location: Location,
    pub name: Option<String>,
    pub employee_ids: Vec<EmployeeId>,
    pub distance_from_start: Meters,
    /// Driving time plus dwell at the previous stops, counted from the
    /// first stop.
    pub time_from_start: SignedDuration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteSequence {
    pub stops: Vec<SequencedStop>,
    pub total_distance: Meters,
    pub total_time: SignedDuration,
}

impl RouteSequence {
    pub fn empty() -> Self {
        RouteSequence {
            stops: vec![],
            total_distance: Meters::ZERO,
            total_time: SignedDuration::ZERO,
        }
    }

    pub fn employee_ids(&self) -> impl Iterator<Item = EmployeeId> + '_ {
        self.stops
            .iter()
            .flat_map(|stop| stop.employee_ids.iter().copied())
    }

    pub fn employee_count(&self) -> usize {
        self.stops.iter().map(|stop| stop.employee_ids.len()).sum()
    }
}

/// Nearest-neighbour ordering of pickup points.
///
/// The tour starts at the member closest to the cluster centroid and always
/// drives to the closest unvisited member next. Members on the exact same
/// coordinate board at one stop.
#[derive(Debug, Clone)]
pub struct RouteSequencer {
    distance_method: DistanceMethod,
    average_speed: Kmh,
    stop_dwell: SignedDuration,
    headquarters: Option<Location>,
}

impl RouteSequencer {
    pub fn new(params: &PlannerParams) -> Self {
        RouteSequencer {
            distance_method: params.distance_method,
            average_speed: params.average_speed,
            stop_dwell: params.stop_dwell,
            headquarters: params.headquarters,
        }
    }

    pub fn sequence(&self, cluster: &Cluster) -> RouteSequence {
        self.sequence_members(cluster.members())
    }

    pub fn sequence_members(&self, members: &[ClusterMember]) -> RouteSequence {
        let Some(centroid) = Location::centroid(members.iter().map(|member| &member.location))
        else {
            return RouteSequence::empty();
        };

        let points = members
            .iter()
            .map(|member| (member.employee_id, member.location))
            .collect::<Vec<_>>();
        let index = GeoIndex::build(&points, self.distance_method);

        let mut visited: FxHashSet<EmployeeId> = FxHashSet::default();
        let mut stops: Vec<PlannedStop> = Vec::new();
        let mut next = index.nearest(&centroid, &visited);

        while let Some(neighbor) = next {
            visited.insert(neighbor.employee_id);

            match stops.last_mut() {
                Some(stop) if stop.location == neighbor.location => {
                    stop.employee_ids.push(neighbor.employee_id);
                }
                _ => stops.push(PlannedStop {
                    location: neighbor.location,
                    name: None,
                    employee_ids: vec![neighbor.employee_id],
                }),
            }

            next = index.nearest(&neighbor.location, &visited);
        }

        self.measure(stops)
    }

    /// Keeps the given order and computes cumulative distance and time.
    pub fn measure(&self, stops: Vec<PlannedStop>) -> RouteSequence {
        if stops.is_empty() {
            return RouteSequence::empty();
        }

        let mut distance = Meters::ZERO;
        let mut previous: Option<Location> = None;
        let mut sequenced = Vec::with_capacity(stops.len());

        for (order, stop) in stops.into_iter().enumerate() {
            if let Some(previous) = previous {
                distance += previous.distance(&stop.location, self.distance_method);
            }
            previous = Some(stop.location);

            sequenced.push(SequencedStop {
                order,
                location: stop.location,
                name: stop.name,
                employee_ids: stop.employee_ids,
                distance_from_start: distance,
                time_from_start: self.travel_time(distance, order),
            });
        }

        if let (Some(last), Some(headquarters)) = (previous, self.headquarters) {
            distance += last.distance(&headquarters, self.distance_method);
        }

        let total_time = self.travel_time(distance, sequenced.len());

        RouteSequence {
            stops: sequenced,
            total_distance: distance,
            total_time,
        }
    }

    fn travel_time(&self, distance: Meters, stops_served: usize) -> SignedDuration {
        let dwell = self.stop_dwell * i32::try_from(stops_served).unwrap_or(i32::MAX);
        (distance / self.average_speed) + dwell
    }
}
