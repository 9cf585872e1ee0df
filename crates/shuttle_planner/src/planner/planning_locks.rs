use std::fmt::Display;

use fxhash::FxHashSet;
use jiff::civil::Date;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::PlanningError,
    problem::ids::{OrganizationId, ShiftId},
};

/// Everything that reads pending employees or shuttle bookings and then
/// writes routes runs under the key of the shift and date it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PlanningKey {
    pub organization_id: OrganizationId,
    pub shift_id: ShiftId,
    pub date: Date,
}

impl Display for PlanningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "organization {} shift {} on {}",
            self.organization_id, self.shift_id, self.date
        )
    }
}

/// Keyed, non-blocking mutual exclusion. A second caller for a held key gets
/// [`PlanningError::ConcurrentPlanningConflict`] instead of waiting.
#[derive(Debug, Default)]
pub struct PlanningLocks {
    held: Mutex<FxHashSet<PlanningKey>>,
}

impl PlanningLocks {
    pub fn try_acquire(&self, key: PlanningKey) -> Result<PlanningGuard<'_>, PlanningError> {
        if !self.held.lock().insert(key) {
            debug!(%key, "Planning key already held");
            return Err(PlanningError::ConcurrentPlanningConflict(key));
        }

        Ok(PlanningGuard { locks: self, key })
    }

    pub fn is_held(&self, key: &PlanningKey) -> bool {
        self.held.lock().contains(key)
    }
}

/// Releases its key when dropped, including on early returns and panics.
#[derive(Debug)]
pub struct PlanningGuard<'a> {
    locks: &'a PlanningLocks,
    key: PlanningKey,
}

impl PlanningGuard<'_> {
    pub fn key(&self) -> PlanningKey {
        self.key
    }
}

impl Drop for PlanningGuard<'_> {
    fn drop(&mut self) {
        self.locks.held.lock().remove(&self.key);
    }
}
