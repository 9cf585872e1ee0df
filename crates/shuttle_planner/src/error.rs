use jiff::civil::Date;
use thiserror::Error;

use crate::{
    plan::route::RouteStatus,
    planner::planning_locks::PlanningKey,
    problem::{ids::EmployeeId, ids::RouteId, ids::ShiftId},
    store::StoreError,
};

#[derive(Debug, Error)]
pub enum PlanningError {
    #[error("cluster capacity must be greater than zero, got {0}")]
    InvalidCapacity(u32),

    #[error("route {route_id} already carries {assigned} of {capacity} seats")]
    CapacityExceeded {
        route_id: RouteId,
        assigned: usize,
        capacity: u32,
    },

    #[error("a planning run for {0} is already in progress, retry once it commits")]
    ConcurrentPlanningConflict(PlanningKey),

    #[error("assignment refers to cluster {cluster_index}, the plan has {clusters}")]
    UnknownCluster { cluster_index: usize, clusters: usize },

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("shift {0} not found")]
    ShiftNotFound(ShiftId),

    #[error("route {0} not found")]
    RouteNotFound(RouteId),

    #[error("employee {0} not found")]
    EmployeeNotFound(EmployeeId),

    #[error("employee {employee_id} is not assigned to route {route_id}")]
    EmployeeNotOnRoute {
        route_id: RouteId,
        employee_id: EmployeeId,
    },

    #[error("employee {employee_id} already rides route {route_id} on that shift and date")]
    EmployeeAlreadyAssigned {
        route_id: RouteId,
        employee_id: EmployeeId,
    },

    #[error("employee {employee_id} works shift {employee_shift}, route runs shift {route_shift}")]
    EmployeeShiftMismatch {
        employee_id: EmployeeId,
        employee_shift: ShiftId,
        route_shift: ShiftId,
    },

    #[error("route {route_id} is {status} and can no longer be edited")]
    RouteNotEditable {
        route_id: RouteId,
        status: RouteStatus,
    },

    #[error("route {route_id} cannot go from {from} to {to}")]
    InvalidTransition {
        route_id: RouteId,
        from: RouteStatus,
        to: RouteStatus,
    },

    #[error("invalid date range {start}..={end}")]
    InvalidDateRange { start: Date, end: Date },

    #[error("invalid time zone or shift time for shift {shift_id}: {source}")]
    InvalidTimeZone {
        shift_id: ShiftId,
        #[source]
        source: jiff::Error,
    },
}
