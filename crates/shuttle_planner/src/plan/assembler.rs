use jiff::civil::Date;
use tracing::{debug, info, instrument};

use crate::{
    error::PlanningError,
    planner::{
        cluster_builder::ClusterMember,
        planning_locks::PlanningLocks,
        route_sequencer::{RouteSequence, RouteSequencer},
        shuttle_allocator::ShuttleAssignment,
    },
    problem::{
        ids::{EmployeeId, OrganizationId, RouteId, TemplateId},
        shift::Shift,
        time_window::TimeWindow,
    },
    store::{PlanningStore, StoreError},
};

use super::route::{Route, RouteDraft, RouteRevision, RouteStatus};

/// Turns sequenced, allocated clusters into persisted routes and applies
/// every later change to them.
///
/// Writes for a route happen under the planning key of its shift and date.
pub struct RoutePlanAssembler<'a, S> {
    store: &'a S,
    sequencer: &'a RouteSequencer,
    locks: &'a PlanningLocks,
}

impl<'a, S: PlanningStore> RoutePlanAssembler<'a, S> {
    pub fn new(store: &'a S, sequencer: &'a RouteSequencer, locks: &'a PlanningLocks) -> Self {
        RoutePlanAssembler {
            store,
            sequencer,
            locks,
        }
    }

    /// Persists one pending route per assignment in a single atomic write.
    /// `assignment.cluster_index` indexes into `sequences`.
    ///
    /// The caller must hold the planning key of `shift` and `date`.
    pub fn commit_plan(
        &self,
        sequences: &[RouteSequence],
        assignments: &[ShuttleAssignment],
        shift: &Shift,
        date: Date,
        organization_id: OrganizationId,
        template_id: Option<TemplateId>,
    ) -> Result<Vec<Route>, PlanningError> {
        if assignments.is_empty() {
            return Ok(vec![]);
        }

        let window = shift.window(date)?;
        let drafts = assignments
            .iter()
            .map(|assignment| {
                let sequence = sequences.get(assignment.cluster_index).ok_or(
                    PlanningError::UnknownCluster {
                        cluster_index: assignment.cluster_index,
                        clusters: sequences.len(),
                    },
                )?;
                Ok(self.draft(
                    format!("{} {} #{}", shift.name, date, assignment.cluster_index + 1),
                    sequence,
                    assignment,
                    shift,
                    window,
                    date,
                    organization_id,
                    template_id,
                ))
            })
            .collect::<Result<Vec<_>, PlanningError>>()?;

        let routes = self.store.insert_routes(drafts)?;

        info!(
            shift = %shift.id,
            %date,
            routes = routes.len(),
            "Committed route plan"
        );

        Ok(routes)
    }

    /// Persists a single route with a caller-chosen name.
    #[allow(clippy::too_many_arguments)]
    pub fn commit_route(
        &self,
        name: String,
        sequence: &RouteSequence,
        assignment: &ShuttleAssignment,
        shift: &Shift,
        date: Date,
        organization_id: OrganizationId,
        template_id: Option<TemplateId>,
    ) -> Result<Route, PlanningError> {
        let window = shift.window(date)?;
        let draft = self.draft(
            name,
            sequence,
            assignment,
            shift,
            window,
            date,
            organization_id,
            template_id,
        );

        let mut routes = self.store.insert_routes(vec![draft])?;
        routes.pop().ok_or_else(|| {
            StoreError::Backend(String::from("insert returned no route")).into()
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn draft(
        &self,
        name: String,
        sequence: &RouteSequence,
        assignment: &ShuttleAssignment,
        shift: &Shift,
        window: TimeWindow,
        date: Date,
        organization_id: OrganizationId,
        template_id: Option<TemplateId>,
    ) -> RouteDraft {
        RouteDraft {
            name,
            organization_id,
            shift_id: shift.id,
            shuttle_id: assignment.shuttle_id,
            driver_id: assignment.driver_id,
            template_id,
            date,
            window,
            revision: RouteRevision::from_sequence(sequence, &window),
        }
    }

    fn load(&self, route_id: RouteId) -> Result<Route, PlanningError> {
        self.store
            .route(route_id)?
            .ok_or(PlanningError::RouteNotFound(route_id))
    }

    /// Loads the route, takes its planning key and loads it again so the
    /// returned snapshot cannot predate the lock.
    fn lock_and_load<R>(
        &self,
        route_id: RouteId,
        f: impl FnOnce(Route) -> Result<R, PlanningError>,
    ) -> Result<R, PlanningError> {
        let key = self.load(route_id)?.key();
        let _guard = self.locks.try_acquire(key)?;

        f(self.load(route_id)?)
    }

    fn ensure_editable(route: &Route) -> Result<(), PlanningError> {
        if route.status != RouteStatus::Pending {
            return Err(PlanningError::RouteNotEditable {
                route_id: route.id,
                status: route.status,
            });
        }
        Ok(())
    }

    fn resequence(
        &self,
        route: &Route,
        members: &[ClusterMember],
    ) -> Result<Route, PlanningError> {
        let sequence = self.sequencer.sequence_members(members);
        let revision = RouteRevision::from_sequence(&sequence, &route.window);

        Ok(self.store.revise_route(route.id, revision)?)
    }

    /// Adds a pending employee of the route's shift and resequences the whole
    /// route. A full shuttle leaves the route untouched.
    #[instrument(skip(self), level = "debug")]
    pub fn add_employee(
        &self,
        route_id: RouteId,
        employee_id: EmployeeId,
    ) -> Result<Route, PlanningError> {
        self.lock_and_load(route_id, |route| {
            Self::ensure_editable(&route)?;

            let employee = self
                .store
                .employee(employee_id, route.date)?
                .filter(|employee| {
                    employee.active && employee.organization_id == route.organization_id
                })
                .ok_or(PlanningError::EmployeeNotFound(employee_id))?;

            if employee.shift_id != route.shift_id {
                return Err(PlanningError::EmployeeShiftMismatch {
                    employee_id,
                    employee_shift: employee.shift_id,
                    route_shift: route.shift_id,
                });
            }

            if employee.assigned {
                let riding = self
                    .store
                    .routes(route.organization_id, route.date)?
                    .into_iter()
                    .find(|other| {
                        other.status != RouteStatus::Cancelled
                            && other.shift_id == route.shift_id
                            && other.carries(employee_id)
                    })
                    .map_or(route.id, |other| other.id);

                return Err(PlanningError::EmployeeAlreadyAssigned {
                    route_id: riding,
                    employee_id,
                });
            }

            let capacity = self
                .store
                .shuttle(route.shuttle_id)?
                .map_or(0, |shuttle| shuttle.capacity);
            if route.employee_count() + 1 > capacity as usize {
                debug!(route = %route.id, capacity, "Shuttle is full");
                return Err(PlanningError::CapacityExceeded {
                    route_id,
                    assigned: route.employee_count(),
                    capacity,
                });
            }

            let mut members = route.members();
            members.push((&employee).into());

            self.resequence(&route, &members)
        })
    }

    /// Removes an employee and resequences what is left. A route whose last
    /// employee leaves keeps existing with no stops and zero totals.
    #[instrument(skip(self), level = "debug")]
    pub fn remove_employee(
        &self,
        route_id: RouteId,
        employee_id: EmployeeId,
    ) -> Result<Route, PlanningError> {
        self.lock_and_load(route_id, |route| {
            Self::ensure_editable(&route)?;

            if !route.carries(employee_id) {
                return Err(PlanningError::EmployeeNotOnRoute {
                    route_id,
                    employee_id,
                });
            }

            let members = route
                .members()
                .into_iter()
                .filter(|member| member.employee_id != employee_id)
                .collect::<Vec<_>>();

            self.resequence(&route, &members)
        })
    }

    pub fn start_route(&self, route_id: RouteId) -> Result<Route, PlanningError> {
        self.transition(route_id, RouteStatus::Active)
    }

    /// Completing an already completed route is a no-op.
    pub fn complete_route(&self, route_id: RouteId) -> Result<Route, PlanningError> {
        self.transition(route_id, RouteStatus::Completed)
    }

    /// Frees the shuttle and returns the employees to the pending pool.
    pub fn cancel_route(&self, route_id: RouteId) -> Result<Route, PlanningError> {
        self.transition(route_id, RouteStatus::Cancelled)
    }

    #[instrument(skip(self), level = "debug")]
    fn transition(&self, route_id: RouteId, to: RouteStatus) -> Result<Route, PlanningError> {
        self.lock_and_load(route_id, |route| {
            if route.status == to {
                return Ok(route);
            }

            if !route.status.can_transition_to(to) {
                return Err(PlanningError::InvalidTransition {
                    route_id,
                    from: route.status,
                    to,
                });
            }

            let route = self.store.set_route_status(route_id, to)?;
            info!(route = %route_id, status = %to, "Route status changed");

            Ok(route)
        })
    }
}
