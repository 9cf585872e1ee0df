use std::sync::Arc;

use jiff::civil::Date;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    error::PlanningError,
    plan::{assembler::RoutePlanAssembler, route::Route},
    problem::{
        ids::{EmployeeId, OrganizationId, RouteId, ShiftId, TemplateId},
        shift::Shift,
    },
    recurring::{
        recurring_generator::{DateRange, GenerationReport, RecurringRouteGenerator},
        route_template::RouteTemplate,
        weekday_mask::WeekdayMask,
    },
    store::PlanningStore,
};

use super::{
    cluster_builder::{ClusterBuilder, ClusterMember},
    planner_params::{ClusterCapacity, PlannerParams},
    planning_locks::{PlanningKey, PlanningLocks},
    route_sequencer::{RouteSequence, RouteSequencer},
    shuttle_allocator::{ShuttleAllocator, UnallocatedCluster, UnallocatedReason},
};

#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanOutcome {
    pub routes: Vec<Route>,
    /// Clusters no shuttle was free for. Their employees remain pending.
    pub unallocated: Vec<UnallocatedCluster>,
}

impl PlanOutcome {
    pub fn unallocated_employee_count(&self) -> usize {
        self.unallocated
            .iter()
            .map(|cluster| cluster.employee_ids.len())
            .sum()
    }
}

/// Entry point for planning and editing shuttle routes against a store.
pub struct RoutePlanner<S> {
    store: Arc<S>,
    params: PlannerParams,
    sequencer: RouteSequencer,
    locks: PlanningLocks,
}

impl<S: PlanningStore> RoutePlanner<S> {
    pub fn new(store: Arc<S>, params: PlannerParams) -> Self {
        RoutePlanner {
            sequencer: RouteSequencer::new(&params),
            store,
            params,
            locks: PlanningLocks::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn params(&self) -> &PlannerParams {
        &self.params
    }

    pub fn locks(&self) -> &PlanningLocks {
        &self.locks
    }

    pub fn sequencer(&self) -> &RouteSequencer {
        &self.sequencer
    }

    pub fn assembler(&self) -> RoutePlanAssembler<'_, S> {
        RoutePlanAssembler::new(&self.store, &self.sequencer, &self.locks)
    }

    /// Clusters the pending employees of a shift, sequences every cluster,
    /// assigns shuttles and commits the resulting routes atomically.
    #[instrument(skip(self), level = "info")]
    pub fn plan_routes(
        &self,
        organization_id: OrganizationId,
        shift_id: ShiftId,
        date: Date,
    ) -> Result<PlanOutcome, PlanningError> {
        let _guard = self.locks.try_acquire(PlanningKey {
            organization_id,
            shift_id,
            date,
        })?;

        let shift = self.load_shift(organization_id, shift_id)?;
        self.plan_locked(organization_id, &shift, date, None)
    }

    pub(crate) fn load_shift(
        &self,
        organization_id: OrganizationId,
        shift_id: ShiftId,
    ) -> Result<Shift, PlanningError> {
        self.store
            .shift(shift_id)?
            .filter(|shift| shift.organization_id == organization_id)
            .ok_or(PlanningError::ShiftNotFound(shift_id))
    }

    /// Plans with the planning key of `shift` and `date` already held.
    pub(crate) fn plan_locked(
        &self,
        organization_id: OrganizationId,
        shift: &Shift,
        date: Date,
        template_id: Option<TemplateId>,
    ) -> Result<PlanOutcome, PlanningError> {
        let window = shift.window(date)?;

        let members = self
            .store
            .employees(organization_id, shift.id, date)?
            .iter()
            .filter(|employee| employee.is_pending())
            .map(ClusterMember::from)
            .collect::<Vec<_>>();

        if members.is_empty() {
            info!(shift = %shift.id, %date, "No pending employees");
            return Ok(PlanOutcome::default());
        }

        let shuttles = self.store.shuttles(organization_id)?;
        let bookings = self.store.bookings(organization_id, date)?;
        let eligible = ShuttleAllocator::eligible_shuttles(&shuttles, &bookings, &window);

        let fleet = eligible
            .iter()
            .map(|shuttle| shuttle.capacity)
            .filter(|&capacity| capacity > 0)
            .collect::<Vec<_>>();

        let builder = ClusterBuilder::new(self.params.distance_method)
            .with_headquarters(self.params.headquarters);
        let clusters = match self.params.cluster_capacity {
            ClusterCapacity::Fixed(capacity) => {
                builder.cluster(&members, capacity, self.params.target_cluster_count)?
            }
            ClusterCapacity::EligibleFleet if !fleet.is_empty() => {
                builder.cluster_for_fleet(&members, &fleet, self.params.target_cluster_count)?
            }
            ClusterCapacity::EligibleFleet => {
                info!(
                    shift = %shift.id,
                    %date,
                    pending = members.len(),
                    "No eligible shuttle for the shift"
                );
                return Ok(PlanOutcome {
                    routes: vec![],
                    unallocated: vec![UnallocatedCluster {
                        cluster_index: 0,
                        employee_ids: members.iter().map(|member| member.employee_id).collect(),
                        reason: UnallocatedReason::NoEligibleShuttle,
                    }],
                });
            }
        };

        let sequences = clusters
            .par_iter()
            .map(|cluster| self.sequencer.sequence(cluster))
            .collect::<Vec<RouteSequence>>();

        let allocation =
            ShuttleAllocator.allocate(&clusters, &shuttles, &bookings, shift, date)?;

        let routes = self.assembler().commit_plan(
            &sequences,
            &allocation.assignments,
            shift,
            date,
            organization_id,
            template_id,
        )?;

        let outcome = PlanOutcome {
            routes,
            unallocated: allocation.unallocated,
        };

        if !outcome.unallocated.is_empty() {
            warn!(
                shift = %shift.id,
                %date,
                clusters = outcome.unallocated.len(),
                "Clusters left without a shuttle"
            );
        }

        info!(
            shift = %shift.id,
            %date,
            pending = members.len(),
            clusters = clusters.len(),
            routes = outcome.routes.len(),
            unallocated_employees = outcome.unallocated_employee_count(),
            "Planned routes"
        );

        Ok(outcome)
    }

    pub fn add_employee(
        &self,
        route_id: RouteId,
        employee_id: EmployeeId,
    ) -> Result<Route, PlanningError> {
        self.assembler().add_employee(route_id, employee_id)
    }

    pub fn remove_employee(
        &self,
        route_id: RouteId,
        employee_id: EmployeeId,
    ) -> Result<Route, PlanningError> {
        self.assembler().remove_employee(route_id, employee_id)
    }

    pub fn start_route(&self, route_id: RouteId) -> Result<Route, PlanningError> {
        self.assembler().start_route(route_id)
    }

    pub fn complete_route(&self, route_id: RouteId) -> Result<Route, PlanningError> {
        self.assembler().complete_route(route_id)
    }

    pub fn cancel_route(&self, route_id: RouteId) -> Result<Route, PlanningError> {
        self.assembler().cancel_route(route_id)
    }

    pub fn generate_recurring(
        &self,
        templates: &[RouteTemplate],
        organization_id: OrganizationId,
        range: DateRange,
        weekdays: WeekdayMask,
    ) -> Result<GenerationReport, PlanningError> {
        RecurringRouteGenerator::new(self).generate(templates, organization_id, range, weekdays)
    }
}
