use jiff::{ToSpan, civil::Date};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::{
    error::PlanningError,
    plan::route::RouteStatus,
    planner::{
        planning_locks::PlanningKey,
        route_planner::RoutePlanner,
        shuttle_allocator::{ShuttleAllocator, ShuttleAssignment, UnallocatedReason},
    },
    problem::ids::{OrganizationId, RouteId, TemplateId},
    store::PlanningStore,
};

use super::{route_template::RouteTemplate, weekday_mask::WeekdayMask};

/// Inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: Date,
    end: Date,
}

impl DateRange {
    pub fn new(start: Date, end: Date) -> Result<Self, PlanningError> {
        if end < start {
            return Err(PlanningError::InvalidDateRange { start, end });
        }
        Ok(DateRange { start, end })
    }

    pub fn start(&self) -> Date {
        self.start
    }

    pub fn end(&self) -> Date {
        self.end
    }

    pub fn days(&self) -> impl Iterator<Item = Date> {
        let end = self.end;
        self.start
            .series(1.day())
            .take_while(move |date| *date <= end)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GenerationOutcome {
    Created {
        route_ids: Vec<RouteId>,
        unallocated_employees: usize,
    },
    /// A non-cancelled route from the same template already runs that day.
    DuplicateRoute { existing_route_id: RouteId },
    Unallocated { reason: UnallocatedReason },
    /// Nothing was written for this template and date. Other dates still run.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationEntry {
    pub template_id: TemplateId,
    pub date: Date,
    #[serde(flatten)]
    pub outcome: GenerationOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerationReport {
    pub entries: Vec<GenerationEntry>,
}

impl GenerationReport {
    fn count(&self, predicate: impl Fn(&GenerationOutcome) -> bool) -> usize {
        self.entries
            .iter()
            .filter(|entry| predicate(&entry.outcome))
            .count()
    }

    pub fn created(&self) -> usize {
        self.count(|outcome| matches!(outcome, GenerationOutcome::Created { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, GenerationOutcome::DuplicateRoute { .. }))
    }

    pub fn unallocated(&self) -> usize {
        self.count(|outcome| matches!(outcome, GenerationOutcome::Unallocated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, GenerationOutcome::Failed { .. }))
    }

    pub fn route_ids(&self) -> impl Iterator<Item = RouteId> + '_ {
        self.entries
            .iter()
            .filter_map(|entry| match &entry.outcome {
                GenerationOutcome::Created { route_ids, .. } => Some(route_ids),
                _ => None,
            })
            .flatten()
            .copied()
    }
}

/// Instantiates route templates over a range of dates.
///
/// Every template and date is committed on its own under the planning key of
/// the template's shift. A failing pair is reported as
/// [`GenerationOutcome::Failed`] and the run moves on, so the report always
/// lists every route that was written. Running the generator twice over the
/// same range creates nothing the second time.
pub struct RecurringRouteGenerator<'a, S> {
    planner: &'a RoutePlanner<S>,
}

impl<'a, S: PlanningStore> RecurringRouteGenerator<'a, S> {
    pub fn new(planner: &'a RoutePlanner<S>) -> Self {
        RecurringRouteGenerator { planner }
    }

    #[instrument(skip(self, templates), fields(templates = templates.len()))]
    pub fn generate(
        &self,
        templates: &[RouteTemplate],
        organization_id: OrganizationId,
        range: DateRange,
        weekdays: WeekdayMask,
    ) -> Result<GenerationReport, PlanningError> {
        let mut report = GenerationReport::default();

        for date in range
            .days()
            .filter(|date| weekdays.contains(date.weekday()))
        {
            for template in templates {
                let outcome = self
                    .instantiate(template, organization_id, date)
                    .unwrap_or_else(|error| {
                        warn!(template = %template.id, %date, %error, "Template instantiation failed");
                        GenerationOutcome::Failed {
                            error: error.to_string(),
                        }
                    });
                report.entries.push(GenerationEntry {
                    template_id: template.id,
                    date,
                    outcome,
                });
            }
        }

        info!(
            created = report.created(),
            skipped = report.skipped(),
            unallocated = report.unallocated(),
            failed = report.failed(),
            "Generated recurring routes"
        );

        Ok(report)
    }

    fn instantiate(
        &self,
        template: &RouteTemplate,
        organization_id: OrganizationId,
        date: Date,
    ) -> Result<GenerationOutcome, PlanningError> {
        let _guard = self.planner.locks().try_acquire(PlanningKey {
            organization_id,
            shift_id: template.shift_id,
            date,
        })?;
        let store = self.planner.store();

        if let Some(existing) = store.routes(organization_id, date)?.into_iter().find(|route| {
            route.template_id == Some(template.id) && route.status != RouteStatus::Cancelled
        }) {
            debug!(template = %template.id, %date, route = %existing.id, "Template already instantiated");
            return Ok(GenerationOutcome::DuplicateRoute {
                existing_route_id: existing.id,
            });
        }

        let shift = self.planner.load_shift(organization_id, template.shift_id)?;

        if template.pool_employees {
            let outcome =
                self.planner
                    .plan_locked(organization_id, &shift, date, Some(template.id))?;

            if !outcome.routes.is_empty() {
                return Ok(GenerationOutcome::Created {
                    unallocated_employees: outcome.unallocated_employee_count(),
                    route_ids: outcome.routes.iter().map(|route| route.id).collect(),
                });
            }
            if !outcome.unallocated.is_empty() {
                return Ok(GenerationOutcome::Unallocated {
                    reason: UnallocatedReason::NoEligibleShuttle,
                });
            }
            // Nobody pending, drive the fixed stops.
        }

        let window = shift.window(date)?;
        let shuttles = store
            .shuttles(organization_id)?
            .into_iter()
            .filter(|shuttle| template.shuttle_id.is_none_or(|id| id == shuttle.id))
            .collect::<Vec<_>>();
        let bookings = store.bookings(organization_id, date)?;

        let (matched, _) = ShuttleAllocator.allocate_demands(&[0], &shuttles, &bookings, &window);
        let Some(&(_, shuttle)) = matched.first() else {
            debug!(template = %template.id, %date, "No eligible shuttle for template");
            return Ok(GenerationOutcome::Unallocated {
                reason: UnallocatedReason::NoEligibleShuttle,
            });
        };

        let sequence = self.planner.sequencer().measure(template.planned_stops());
        let route = self.planner.assembler().commit_route(
            format!("{} {}", template.name, date),
            &sequence,
            &ShuttleAssignment {
                cluster_index: 0,
                shuttle_id: shuttle.id,
                driver_id: shuttle.driver_id,
                capacity: shuttle.capacity,
            },
            &shift,
            date,
            organization_id,
            Some(template.id),
        )?;

        Ok(GenerationOutcome::Created {
            route_ids: vec![route.id],
            unallocated_employees: 0,
        })
    }
}
