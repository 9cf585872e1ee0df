use std::collections::BTreeMap;

use fxhash::{FxHashMap, FxHashSet};
use jiff::civil::Date;
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    plan::route::{Route, RouteDraft, RouteEmployeeAssignment, RouteRevision, RouteStatus, Stop},
    problem::{
        employee::Employee,
        ids::{EmployeeId, OrganizationId, RouteId, ShiftId, ShuttleId, StopId},
        shift::Shift,
        shuttle::{BookingKind, Shuttle, ShuttleBooking},
        time_window::TimeWindow,
    },
};

use super::{EmployeeDirectory, RouteStore, ShiftDirectory, ShuttleDirectory, StoreError};

#[derive(Debug, Default)]
struct State {
    employees: FxHashMap<EmployeeId, Employee>,
    shifts: FxHashMap<ShiftId, Shift>,
    shuttles: FxHashMap<ShuttleId, Shuttle>,
    unavailability: Vec<ShuttleBooking>,
    routes: BTreeMap<RouteId, Route>,
    next_route_id: u64,
    next_stop_id: u64,
}

impl State {
    /// The non-cancelled route other than `except` that carries the
    /// employee for the shift and date.
    fn riding_route(
        &self,
        employee_id: EmployeeId,
        shift_id: ShiftId,
        date: Date,
        except: Option<RouteId>,
    ) -> Option<RouteId> {
        self.routes
            .values()
            .filter(|route| {
                route.status != RouteStatus::Cancelled
                    && route.shift_id == shift_id
                    && route.date == date
                    && Some(route.id) != except
            })
            .find(|route| route.carries(employee_id))
            .map(|route| route.id)
    }

    fn resolve(&self, employee: &Employee, date: Date) -> Employee {
        let mut employee = employee.clone();
        employee.assigned = self
            .riding_route(employee.id, employee.shift_id, date, None)
            .is_some();
        employee
    }

    fn check_revision(
        &self,
        route_id: RouteId,
        shuttle_id: ShuttleId,
        shift_id: ShiftId,
        date: Date,
        revision: &RouteRevision,
    ) -> Result<(), StoreError> {
        let shuttle = self
            .shuttles
            .get(&shuttle_id)
            .ok_or(StoreError::UnknownShuttle(shuttle_id))?;

        if !revision.has_contiguous_order() {
            return Err(StoreError::NonContiguousStops);
        }

        let assigned = revision.employee_count();
        if assigned > shuttle.capacity as usize {
            return Err(StoreError::OverCapacity {
                shuttle_id,
                assigned,
                capacity: shuttle.capacity,
            });
        }

        let mut seen = FxHashSet::default();
        for &employee_id in revision.stops.iter().flat_map(|stop| &stop.employee_ids) {
            if !self.employees.contains_key(&employee_id) {
                return Err(StoreError::UnknownEmployee(employee_id));
            }

            let other = if seen.insert(employee_id) {
                self.riding_route(employee_id, shift_id, date, Some(route_id))
            } else {
                Some(route_id)
            };

            if let Some(route_id) = other {
                return Err(StoreError::EmployeeAlreadyAssigned {
                    employee_id,
                    route_id,
                });
            }
        }

        Ok(())
    }

    fn check_shuttle_free(
        &self,
        route_id: RouteId,
        shuttle_id: ShuttleId,
        window: &TimeWindow,
    ) -> Result<(), StoreError> {
        match self.routes.values().find(|route| {
            route.id != route_id
                && route.shuttle_id == shuttle_id
                && route.status.is_open()
                && route.window.overlaps(window)
        }) {
            Some(route) => Err(StoreError::ShuttleDoubleBooked {
                shuttle_id,
                route_id: route.id,
            }),
            None => Ok(()),
        }
    }

    fn materialize(
        &mut self,
        route_id: RouteId,
        revision: RouteRevision,
    ) -> (Vec<Stop>, Vec<RouteEmployeeAssignment>) {
        let mut stops = Vec::with_capacity(revision.stops.len());
        let mut assignments = Vec::with_capacity(revision.employee_count());

        for draft in revision.stops {
            self.next_stop_id += 1;
            let stop_id = StopId::new(self.next_stop_id);

            assignments.extend(
                draft
                    .employee_ids
                    .iter()
                    .map(|&employee_id| RouteEmployeeAssignment {
                        route_id,
                        employee_id,
                        stop_id,
                    }),
            );

            stops.push(Stop {
                id: stop_id,
                route_id,
                order: draft.order,
                location: draft.location,
                name: draft.name,
                estimated_arrival: draft.estimated_arrival,
            });
        }

        (stops, assignments)
    }
}

/// A [`PlanningStore`](super::PlanningStore) kept in process memory.
///
/// Writes validate against the whole current state under the write lock
/// before anything is applied, so a rejected batch leaves no trace.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_shift(&self, shift: Shift) {
        self.state.write().shifts.insert(shift.id, shift);
    }

    pub fn insert_employee(&self, employee: Employee) {
        self.state.write().employees.insert(employee.id, employee);
    }

    pub fn insert_shuttle(&self, shuttle: Shuttle) {
        self.state.write().shuttles.insert(shuttle.id, shuttle);
    }

    pub fn insert_unavailability(&self, shuttle_id: ShuttleId, window: TimeWindow) {
        self.state.write().unavailability.push(ShuttleBooking {
            shuttle_id,
            window,
            kind: BookingKind::Unavailable,
        });
    }

    pub fn all_routes(&self) -> Vec<Route> {
        self.state.read().routes.values().cloned().collect()
    }
}

impl EmployeeDirectory for InMemoryStore {
    fn employees(
        &self,
        organization_id: OrganizationId,
        shift_id: ShiftId,
        date: Date,
    ) -> Result<Vec<Employee>, StoreError> {
        let state = self.state.read();
        let mut employees = state
            .employees
            .values()
            .filter(|employee| {
                employee.organization_id == organization_id && employee.shift_id == shift_id
            })
            .map(|employee| state.resolve(employee, date))
            .collect::<Vec<_>>();
        employees.sort_by_key(|employee| employee.id);

        Ok(employees)
    }

    fn employee(
        &self,
        employee_id: EmployeeId,
        date: Date,
    ) -> Result<Option<Employee>, StoreError> {
        let state = self.state.read();
        Ok(state
            .employees
            .get(&employee_id)
            .map(|employee| state.resolve(employee, date)))
    }
}

impl ShiftDirectory for InMemoryStore {
    fn shift(&self, shift_id: ShiftId) -> Result<Option<Shift>, StoreError> {
        Ok(self.state.read().shifts.get(&shift_id).cloned())
    }
}

impl ShuttleDirectory for InMemoryStore {
    fn shuttles(&self, organization_id: OrganizationId) -> Result<Vec<Shuttle>, StoreError> {
        let mut shuttles = self
            .state
            .read()
            .shuttles
            .values()
            .filter(|shuttle| shuttle.organization_id == organization_id)
            .cloned()
            .collect::<Vec<_>>();
        shuttles.sort_by_key(|shuttle| shuttle.id);

        Ok(shuttles)
    }

    fn shuttle(&self, shuttle_id: ShuttleId) -> Result<Option<Shuttle>, StoreError> {
        Ok(self.state.read().shuttles.get(&shuttle_id).cloned())
    }

    fn bookings(
        &self,
        organization_id: OrganizationId,
        date: Date,
    ) -> Result<Vec<ShuttleBooking>, StoreError> {
        let state = self.state.read();
        // Overnight shifts reach into the neighbouring days.
        let from = date.yesterday().unwrap_or(date);
        let to = date.tomorrow().unwrap_or(date);

        let owned = |shuttle_id: &ShuttleId| {
            state
                .shuttles
                .get(shuttle_id)
                .is_some_and(|shuttle| shuttle.organization_id == organization_id)
        };

        let routes = state
            .routes
            .values()
            .filter(|route| {
                route.status.is_open()
                    && route.date >= from
                    && route.date <= to
                    && owned(&route.shuttle_id)
            })
            .map(Route::booking);

        let unavailable = state
            .unavailability
            .iter()
            .filter(|booking| owned(&booking.shuttle_id))
            .copied();

        Ok(routes.chain(unavailable).collect())
    }
}

impl RouteStore for InMemoryStore {
    fn route(&self, route_id: RouteId) -> Result<Option<Route>, StoreError> {
        Ok(self.state.read().routes.get(&route_id).cloned())
    }

    fn routes(
        &self,
        organization_id: OrganizationId,
        date: Date,
    ) -> Result<Vec<Route>, StoreError> {
        Ok(self
            .state
            .read()
            .routes
            .values()
            .filter(|route| route.organization_id == organization_id && route.date == date)
            .cloned()
            .collect())
    }

    fn insert_routes(&self, drafts: Vec<RouteDraft>) -> Result<Vec<Route>, StoreError> {
        let mut state = self.state.write();

        let first_id = state.next_route_id + 1;
        let route_ids = (0..drafts.len() as u64)
            .map(|offset| RouteId::new(first_id + offset))
            .collect::<Vec<_>>();

        let mut claimed: FxHashMap<(ShiftId, Date, EmployeeId), RouteId> = FxHashMap::default();
        let mut booked: Vec<(RouteId, ShuttleId, TimeWindow)> = Vec::new();

        for (&route_id, draft) in route_ids.iter().zip(&drafts) {
            state.check_revision(
                route_id,
                draft.shuttle_id,
                draft.shift_id,
                draft.date,
                &draft.revision,
            )?;
            state.check_shuttle_free(route_id, draft.shuttle_id, &draft.window)?;

            if let Some(&(other, shuttle_id, _)) = booked.iter().find(|(_, shuttle_id, window)| {
                *shuttle_id == draft.shuttle_id && window.overlaps(&draft.window)
            }) {
                return Err(StoreError::ShuttleDoubleBooked {
                    shuttle_id,
                    route_id: other,
                });
            }
            booked.push((route_id, draft.shuttle_id, draft.window));

            for stop in &draft.revision.stops {
                for &employee_id in &stop.employee_ids {
                    if let Some(&other) =
                        claimed.get(&(draft.shift_id, draft.date, employee_id))
                    {
                        return Err(StoreError::EmployeeAlreadyAssigned {
                            employee_id,
                            route_id: other,
                        });
                    }
                    claimed.insert((draft.shift_id, draft.date, employee_id), route_id);
                }
            }
        }

        let mut routes = Vec::with_capacity(drafts.len());
        for (route_id, draft) in route_ids.into_iter().zip(drafts) {
            let total_distance = draft.revision.total_distance;
            let total_time = draft.revision.total_time;
            let (stops, assignments) = state.materialize(route_id, draft.revision);

            let route = Route {
                id: route_id,
                name: draft.name,
                organization_id: draft.organization_id,
                shift_id: draft.shift_id,
                shuttle_id: draft.shuttle_id,
                driver_id: draft.driver_id,
                template_id: draft.template_id,
                date: draft.date,
                window: draft.window,
                status: RouteStatus::Pending,
                total_distance,
                total_time,
                stops,
                assignments,
            };

            state.next_route_id = route_id.get();
            state.routes.insert(route_id, route.clone());
            routes.push(route);
        }

        debug!(routes = routes.len(), "Inserted routes");

        Ok(routes)
    }

    fn revise_route(
        &self,
        route_id: RouteId,
        revision: RouteRevision,
    ) -> Result<Route, StoreError> {
        let mut state = self.state.write();

        let (shuttle_id, shift_id, date) = state
            .routes
            .get(&route_id)
            .map(|route| (route.shuttle_id, route.shift_id, route.date))
            .ok_or(StoreError::UnknownRoute(route_id))?;

        state.check_revision(route_id, shuttle_id, shift_id, date, &revision)?;

        let total_distance = revision.total_distance;
        let total_time = revision.total_time;
        let (stops, assignments) = state.materialize(route_id, revision);

        let route = state
            .routes
            .get_mut(&route_id)
            .ok_or(StoreError::UnknownRoute(route_id))?;
        route.stops = stops;
        route.assignments = assignments;
        route.total_distance = total_distance;
        route.total_time = total_time;

        Ok(route.clone())
    }

    fn set_route_status(
        &self,
        route_id: RouteId,
        status: RouteStatus,
    ) -> Result<Route, StoreError> {
        let mut state = self.state.write();
        let route = state
            .routes
            .get_mut(&route_id)
            .ok_or(StoreError::UnknownRoute(route_id))?;
        route.status = status;

        Ok(route.clone())
    }
}

#[cfg(test)]
mod tests {
    use jiff::{SignedDuration, civil::date};

    use super::*;
    use crate::{
        plan::route::StopDraft,
        problem::{location::Location, meters::Meters},
        test_utils,
    };

    fn window() -> TimeWindow {
        TimeWindow::from_iso("2025-06-10T08:00:00Z", "2025-06-10T16:00:00Z").unwrap()
    }

    fn draft(shuttle_id: u64, employee_ids: &[u64]) -> RouteDraft {
        RouteDraft {
            name: String::from("Morning"),
            organization_id: OrganizationId::new(1),
            shift_id: ShiftId::new(1),
            shuttle_id: ShuttleId::new(shuttle_id),
            driver_id: None,
            template_id: None,
            date: date(2025, 6, 10),
            window: window(),
            revision: RouteRevision {
                stops: employee_ids
                    .iter()
                    .enumerate()
                    .map(|(order, &id)| StopDraft {
                        order,
                        location: Location::from_cartesian(id as f64, 0.0),
                        name: None,
                        estimated_arrival: None,
                        employee_ids: vec![EmployeeId::new(id)],
                    })
                    .collect(),
                total_distance: Meters::new(employee_ids.len() as f64),
                total_time: SignedDuration::from_mins(10),
            },
        }
    }

    fn store() -> InMemoryStore {
        let store = test_utils::create_store(&[(1, 4), (2, 4)]);
        for id in 1..=6 {
            store.insert_employee(test_utils::create_employee(id, id as f64, 0.0));
        }
        store
    }

    #[test]
    fn test_insert_assigns_ids_and_marks_employees() {
        let store = store();

        let routes = store.insert_routes(vec![draft(1, &[1, 2])]).unwrap();

        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].status, RouteStatus::Pending);
        assert_eq!(routes[0].stops.len(), 2);
        assert_eq!(routes[0].assignments.len(), 2);

        let employees = store
            .employees(OrganizationId::new(1), ShiftId::new(1), date(2025, 6, 10))
            .unwrap();
        let assigned = employees
            .iter()
            .filter(|employee| employee.assigned)
            .map(|employee| employee.id.get())
            .collect::<Vec<_>>();
        assert_eq!(assigned, vec![1, 2]);

        // Assignment is per date.
        let next_day = store
            .employee(EmployeeId::new(1), date(2025, 6, 11))
            .unwrap()
            .unwrap();
        assert!(!next_day.assigned);
    }

    #[test]
    fn test_rejected_batch_leaves_no_trace() {
        let store = store();

        let result = store.insert_routes(vec![draft(1, &[1, 2]), draft(2, &[3, 4, 5, 6, 1])]);

        assert!(matches!(result, Err(StoreError::OverCapacity { .. })));
        assert!(store.all_routes().is_empty());
        assert!(
            !store
                .employee(EmployeeId::new(1), date(2025, 6, 10))
                .unwrap()
                .unwrap()
                .assigned
        );
    }

    #[test]
    fn test_employee_claimed_twice_in_one_batch() {
        let store = store();

        let result = store.insert_routes(vec![draft(1, &[1, 2]), draft(2, &[2, 3])]);

        assert!(matches!(
            result,
            Err(StoreError::EmployeeAlreadyAssigned { employee_id, .. }) if employee_id == EmployeeId::new(2)
        ));
        assert!(store.all_routes().is_empty());
    }

    #[test]
    fn test_shuttle_cannot_be_double_booked() {
        let store = store();
        store.insert_routes(vec![draft(1, &[1])]).unwrap();

        assert!(matches!(
            store.insert_routes(vec![draft(1, &[2])]),
            Err(StoreError::ShuttleDoubleBooked { .. })
        ));
        assert!(matches!(
            store.insert_routes(vec![draft(2, &[2]), draft(2, &[3])]),
            Err(StoreError::ShuttleDoubleBooked { .. })
        ));
        assert_eq!(store.all_routes().len(), 1);
    }

    #[test]
    fn test_cancelled_route_releases_shuttle_and_employees() {
        let store = store();
        let route = store.insert_routes(vec![draft(1, &[1])]).unwrap().remove(0);
        store
            .set_route_status(route.id, RouteStatus::Cancelled)
            .unwrap();

        assert!(store.insert_routes(vec![draft(1, &[1])]).is_ok());
    }

    #[test]
    fn test_revision_replaces_stops() {
        let store = store();
        let route = store.insert_routes(vec![draft(1, &[1, 2])]).unwrap().remove(0);

        let revised = store
            .revise_route(route.id, draft(1, &[2, 3]).revision)
            .unwrap();

        assert_eq!(
            revised.employee_ids().map(|id| id.get()).collect::<Vec<_>>(),
            vec![2, 3]
        );
        assert!(
            !store
                .employee(EmployeeId::new(1), date(2025, 6, 10))
                .unwrap()
                .unwrap()
                .assigned
        );
    }

    #[test]
    fn test_non_contiguous_stops_are_rejected() {
        let store = store();
        let mut draft = draft(1, &[1, 2]);
        draft.revision.stops[1].order = 5;

        assert_eq!(
            store.insert_routes(vec![draft]),
            Err(StoreError::NonContiguousStops)
        );
    }

    #[test]
    fn test_bookings_include_routes_and_unavailability() {
        let store = store();
        let route = store.insert_routes(vec![draft(1, &[1])]).unwrap().remove(0);
        store.insert_unavailability(ShuttleId::new(2), window());

        let bookings = store
            .bookings(OrganizationId::new(1), date(2025, 6, 10))
            .unwrap();

        assert_eq!(bookings.len(), 2);
        assert!(bookings.contains(&route.booking()));
        assert!(
            bookings
                .iter()
                .any(|booking| booking.kind == BookingKind::Unavailable)
        );
    }
}
