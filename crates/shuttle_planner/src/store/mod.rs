use jiff::civil::Date;
use thiserror::Error;

use crate::{
    plan::route::{Route, RouteDraft, RouteRevision, RouteStatus},
    problem::{
        employee::Employee,
        ids::{EmployeeId, OrganizationId, RouteId, ShiftId, ShuttleId},
        shift::Shift,
        shuttle::{Shuttle, ShuttleBooking},
    },
};

pub mod in_memory;

/// Rejections raised by a store when a write would break a persisted
/// invariant. A rejected write leaves the store unchanged.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("route {0} does not exist")]
    UnknownRoute(RouteId),

    #[error("shuttle {0} does not exist")]
    UnknownShuttle(ShuttleId),

    #[error("employee {0} does not exist")]
    UnknownEmployee(EmployeeId),

    #[error("employee {employee_id} is already on route {route_id} for that shift and date")]
    EmployeeAlreadyAssigned {
        employee_id: EmployeeId,
        route_id: RouteId,
    },

    #[error("shuttle {shuttle_id} seats {capacity}, route needs {assigned}")]
    OverCapacity {
        shuttle_id: ShuttleId,
        assigned: usize,
        capacity: u32,
    },

    #[error("shuttle {shuttle_id} is already booked by route {route_id} in an overlapping window")]
    ShuttleDoubleBooked {
        shuttle_id: ShuttleId,
        route_id: RouteId,
    },

    #[error("stops must be ordered 0..n without gaps")]
    NonContiguousStops,

    #[error("storage backend failure: {0}")]
    Backend(String),
}

pub trait EmployeeDirectory {
    /// Active and inactive employees of the shift, with `assigned` resolved
    /// for `date`.
    fn employees(
        &self,
        organization_id: OrganizationId,
        shift_id: ShiftId,
        date: Date,
    ) -> Result<Vec<Employee>, StoreError>;

    fn employee(&self, employee_id: EmployeeId, date: Date)
    -> Result<Option<Employee>, StoreError>;
}

pub trait ShiftDirectory {
    fn shift(&self, shift_id: ShiftId) -> Result<Option<Shift>, StoreError>;
}

pub trait ShuttleDirectory {
    fn shuttles(&self, organization_id: OrganizationId) -> Result<Vec<Shuttle>, StoreError>;

    fn shuttle(&self, shuttle_id: ShuttleId) -> Result<Option<Shuttle>, StoreError>;

    /// Open route bookings and unavailability records that may overlap a
    /// shift starting on `date`.
    fn bookings(
        &self,
        organization_id: OrganizationId,
        date: Date,
    ) -> Result<Vec<ShuttleBooking>, StoreError>;
}

pub trait RouteStore {
    fn route(&self, route_id: RouteId) -> Result<Option<Route>, StoreError>;

    fn routes(&self, organization_id: OrganizationId, date: Date)
    -> Result<Vec<Route>, StoreError>;

    /// Persists all drafts or none of them.
    fn insert_routes(&self, drafts: Vec<RouteDraft>) -> Result<Vec<Route>, StoreError>;

    /// Replaces the stops, rider assignments and totals of a route.
    fn revise_route(&self, route_id: RouteId, revision: RouteRevision)
    -> Result<Route, StoreError>;

    fn set_route_status(&self, route_id: RouteId, status: RouteStatus)
    -> Result<Route, StoreError>;
}

/// Everything the planner reads from and writes to.
pub trait PlanningStore:
    EmployeeDirectory + ShiftDirectory + ShuttleDirectory + RouteStore + Send + Sync
{
}

impl<T> PlanningStore for T where
    T: EmployeeDirectory + ShiftDirectory + ShuttleDirectory + RouteStore + Send + Sync
{
}
