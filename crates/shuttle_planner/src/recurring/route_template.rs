use serde::{Deserialize, Serialize};

use crate::{
    planner::route_sequencer::PlannedStop,
    problem::{
        ids::{ShiftId, ShuttleId, TemplateId},
        location::Location,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateStop {
    pub name: String,
    pub location: Location,
}

/// A named route that is instantiated on every matching day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteTemplate {
    pub id: TemplateId,
    pub name: String,
    pub shift_id: ShiftId,
    /// Pins the template to one shuttle. Otherwise the smallest eligible
    /// shuttle is used.
    pub shuttle_id: Option<ShuttleId>,
    /// Fixed pickup points, driven in the given order.
    pub stops: Vec<TemplateStop>,
    /// Cluster the shift's pending employees instead of driving the fixed
    /// stops, when there are any.
    pub pool_employees: bool,
}

impl RouteTemplate {
    pub fn planned_stops(&self) -> Vec<PlannedStop> {
        self.stops
            .iter()
            .map(|stop| PlannedStop {
                location: stop.location,
                name: Some(stop.name.clone()),
                employee_ids: vec![],
            })
            .collect()
    }
}
