use std::fmt::Display;

use jiff::{SignedDuration, Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

use crate::{
    planner::{
        cluster_builder::ClusterMember, planning_locks::PlanningKey,
        route_sequencer::RouteSequence,
    },
    problem::{
        ids::{
            DriverId, EmployeeId, OrganizationId, RouteId, ShiftId, ShuttleId, StopId, TemplateId,
        },
        location::Location,
        meters::Meters,
        shuttle::{BookingKind, ShuttleBooking},
        time_window::TimeWindow,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl RouteStatus {
    /// `pending -> active -> completed`, and `pending | active -> cancelled`.
    pub fn can_transition_to(self, next: RouteStatus) -> bool {
        matches!(
            (self, next),
            (RouteStatus::Pending, RouteStatus::Active)
                | (RouteStatus::Pending, RouteStatus::Completed)
                | (RouteStatus::Active, RouteStatus::Completed)
                | (RouteStatus::Pending, RouteStatus::Cancelled)
                | (RouteStatus::Active, RouteStatus::Cancelled)
        )
    }

    /// Neither completed nor cancelled. Open routes hold their shuttle.
    pub fn is_open(self) -> bool {
        matches!(self, RouteStatus::Pending | RouteStatus::Active)
    }
}

impl Display for RouteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RouteStatus::Pending => "pending",
                RouteStatus::Active => "active",
                RouteStatus::Completed => "completed",
                RouteStatus::Cancelled => "cancelled",
            }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    pub id: StopId,
    pub route_id: RouteId,
    pub order: usize,
    pub location: Location,
    pub name: Option<String>,
    pub estimated_arrival: Option<Timestamp>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEmployeeAssignment {
    pub route_id: RouteId,
    pub employee_id: EmployeeId,
    pub stop_id: StopId,
}

/// Snapshot of a persisted route. Changes only go through the assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub id: RouteId,
    pub name: String,
    pub organization_id: OrganizationId,
    pub shift_id: ShiftId,
    pub shuttle_id: ShuttleId,
    pub driver_id: Option<DriverId>,
    pub template_id: Option<TemplateId>,
    pub date: Date,
    pub window: TimeWindow,
    pub status: RouteStatus,
    pub total_distance: Meters,
    pub total_time: SignedDuration,
    pub stops: Vec<Stop>,
    pub assignments: Vec<RouteEmployeeAssignment>,
}

impl Route {
    pub fn key(&self) -> PlanningKey {
        PlanningKey {
            organization_id: self.organization_id,
            shift_id: self.shift_id,
            date: self.date,
        }
    }

    pub fn employee_count(&self) -> usize {
        self.assignments.len()
    }

    pub fn employee_ids(&self) -> impl Iterator<Item = EmployeeId> + '_ {
        self.assignments
            .iter()
            .map(|assignment| assignment.employee_id)
    }

    pub fn carries(&self, employee_id: EmployeeId) -> bool {
        self.assignments
            .iter()
            .any(|assignment| assignment.employee_id == employee_id)
    }

    /// Riders with the coordinate of the stop they board at.
    pub fn members(&self) -> Vec<ClusterMember> {
        self.assignments
            .iter()
            .filter_map(|assignment| {
                self.stops
                    .iter()
                    .find(|stop| stop.id == assignment.stop_id)
                    .map(|stop| ClusterMember {
                        employee_id: assignment.employee_id,
                        location: stop.location,
                    })
            })
            .collect()
    }

    pub fn booking(&self) -> ShuttleBooking {
        ShuttleBooking {
            shuttle_id: self.shuttle_id,
            window: self.window,
            kind: BookingKind::Route(self.id),
        }
    }
}

/// A stop before the store gives it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct StopDraft {
    pub order: usize,
    pub location: Location,
    pub name: Option<String>,
    pub estimated_arrival: Option<Timestamp>,
    pub employee_ids: Vec<EmployeeId>,
}

/// New stop set and totals for an existing route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRevision {
    pub stops: Vec<StopDraft>,
    pub total_distance: Meters,
    pub total_time: SignedDuration,
}

impl RouteRevision {
    /// Times the pickup run so that it reaches its destination at the start
    /// of `window`.
    pub fn from_sequence(sequence: &RouteSequence, window: &TimeWindow) -> Self {
        let departure = window.start().checked_sub(sequence.total_time).ok();

        RouteRevision {
            stops: sequence
                .stops
                .iter()
                .map(|stop| StopDraft {
                    order: stop.order,
                    location: stop.location,
                    name: stop.name.clone(),
                    estimated_arrival: departure
                        .and_then(|departure| departure.checked_add(stop.time_from_start).ok()),
                    employee_ids: stop.employee_ids.clone(),
                })
                .collect(),
            total_distance: sequence.total_distance,
            total_time: sequence.total_time,
        }
    }

    pub fn employee_count(&self) -> usize {
        self.stops.iter().map(|stop| stop.employee_ids.len()).sum()
    }

    pub fn has_contiguous_order(&self) -> bool {
        self.stops
            .iter()
            .enumerate()
            .all(|(index, stop)| stop.order == index)
    }
}

/// A route before the store gives it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDraft {
    pub name: String,
    pub organization_id: OrganizationId,
    pub shift_id: ShiftId,
    pub shuttle_id: ShuttleId,
    pub driver_id: Option<DriverId>,
    pub template_id: Option<TemplateId>,
    pub date: Date,
    pub window: TimeWindow,
    pub revision: RouteRevision,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{planner::route_sequencer::SequencedStop, problem::ids::EmployeeId};

    #[test]
    fn test_status_transitions() {
        use RouteStatus::*;

        assert!(Pending.can_transition_to(Active));
        assert!(Active.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Active.can_transition_to(Cancelled));

        assert!(!Completed.can_transition_to(Pending));
        assert!(!Completed.can_transition_to(Cancelled));
        assert!(!Cancelled.can_transition_to(Active));
        assert!(!Active.can_transition_to(Pending));
    }

    #[test]
    fn test_revision_arrives_at_window_start() {
        let window = TimeWindow::from_iso("2025-06-10T08:00:00Z", "2025-06-10T16:00:00Z").unwrap();
        let sequence = RouteSequence {
            stops: vec![
                SequencedStop {
                    order: 0,
                    location: Location::from_cartesian(0.0, 0.0),
                    name: None,
                    employee_ids: vec![EmployeeId::new(1)],
                    distance_from_start: Meters::ZERO,
                    time_from_start: SignedDuration::ZERO,
                },
                SequencedStop {
                    order: 1,
                    location: Location::from_cartesian(10.0, 0.0),
                    name: None,
                    employee_ids: vec![EmployeeId::new(2), EmployeeId::new(3)],
                    distance_from_start: Meters::new(10.0),
                    time_from_start: SignedDuration::from_mins(10),
                },
            ],
            total_distance: Meters::new(10.0),
            total_time: SignedDuration::from_mins(30),
        };

        let revision = RouteRevision::from_sequence(&sequence, &window);

        assert!(revision.has_contiguous_order());
        assert_eq!(revision.employee_count(), 3);
        assert_eq!(
            revision.stops[0].estimated_arrival,
            Some("2025-06-10T07:30:00Z".parse().unwrap())
        );
        assert_eq!(
            revision.stops[1].estimated_arrival,
            Some("2025-06-10T07:40:00Z".parse().unwrap())
        );
    }
}
