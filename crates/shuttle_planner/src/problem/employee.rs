use serde::{Deserialize, Serialize};

use super::{
    ids::{DepartmentId, EmployeeId, OrganizationId, ShiftId},
    location::Location,
};

/// An employee as read from the employee directory.
///
/// `assigned` reflects whether the employee already rides a non-cancelled
/// route for the shift and date the directory was queried with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub organization_id: OrganizationId,
    pub name: String,
    pub location: Location,
    pub department_id: Option<DepartmentId>,
    pub shift_id: ShiftId,
    pub assigned: bool,
    pub active: bool,
}

impl Employee {
    pub fn is_pending(&self) -> bool {
        self.active && !self.assigned
    }
}
