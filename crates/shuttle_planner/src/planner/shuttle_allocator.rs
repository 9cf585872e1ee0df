use std::cmp::Reverse;

use fxhash::FxHashSet;
use jiff::civil::Date;
use serde::Serialize;
use tracing::debug;

use crate::{
    error::PlanningError,
    planner::cluster_builder::Cluster,
    problem::{
        ids::{DriverId, EmployeeId, ShuttleId},
        shift::Shift,
        shuttle::{Shuttle, ShuttleBooking},
        time_window::TimeWindow,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnallocatedReason {
    NoEligibleShuttle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ShuttleAssignment {
    pub cluster_index: usize,
    pub shuttle_id: ShuttleId,
    pub driver_id: Option<DriverId>,
    pub capacity: u32,
}

/// A cluster no eligible shuttle could take. Its employees stay unassigned
/// and are left to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnallocatedCluster {
    pub cluster_index: usize,
    pub employee_ids: Vec<EmployeeId>,
    pub reason: UnallocatedReason,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub assignments: Vec<ShuttleAssignment>,
    pub unallocated: Vec<UnallocatedCluster>,
}

/// Best-fit matching of clusters to shuttles: the largest cluster picks
/// first and takes the smallest shuttle that still seats it.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShuttleAllocator;

impl ShuttleAllocator {
    /// Shuttles that are available and not booked during `window`.
    pub fn eligible_shuttles<'a>(
        candidates: &'a [Shuttle],
        bookings: &[ShuttleBooking],
        window: &TimeWindow,
    ) -> Vec<&'a Shuttle> {
        let booked = bookings
            .iter()
            .filter(|booking| booking.window.overlaps(window))
            .map(|booking| booking.shuttle_id)
            .collect::<FxHashSet<_>>();

        candidates
            .iter()
            .filter(|shuttle| shuttle.is_available() && !booked.contains(&shuttle.id))
            .collect()
    }

    pub fn allocate(
        &self,
        clusters: &[Cluster],
        candidates: &[Shuttle],
        bookings: &[ShuttleBooking],
        shift: &Shift,
        date: Date,
    ) -> Result<Allocation, PlanningError> {
        let window = shift.window(date)?;
        let demands = clusters.iter().map(Cluster::len).collect::<Vec<_>>();
        let (matched, unmatched) = self.allocate_demands(&demands, candidates, bookings, &window);

        let allocation = Allocation {
            assignments: matched
                .into_iter()
                .map(|(cluster_index, shuttle)| ShuttleAssignment {
                    cluster_index,
                    shuttle_id: shuttle.id,
                    driver_id: shuttle.driver_id,
                    capacity: shuttle.capacity,
                })
                .collect(),
            unallocated: unmatched
                .into_iter()
                .map(|cluster_index| UnallocatedCluster {
                    cluster_index,
                    employee_ids: clusters[cluster_index].employee_ids().collect(),
                    reason: UnallocatedReason::NoEligibleShuttle,
                })
                .collect(),
        };

        debug!(
            shift = %shift.id,
            %date,
            allocated = allocation.assignments.len(),
            unallocated = allocation.unallocated.len(),
            "Allocated shuttles"
        );

        Ok(allocation)
    }

    /// Matches seat demands to shuttles. Returns the matched
    /// `(demand index, shuttle)` pairs in demand index order and the
    /// indices that found no shuttle.
    pub fn allocate_demands<'a>(
        &self,
        demands: &[usize],
        candidates: &'a [Shuttle],
        bookings: &[ShuttleBooking],
        window: &TimeWindow,
    ) -> (Vec<(usize, &'a Shuttle)>, Vec<usize>) {
        let mut free = Self::eligible_shuttles(candidates, bookings, window);
        free.sort_by_key(|shuttle| (shuttle.capacity, shuttle.id));

        let mut order = (0..demands.len()).collect::<Vec<_>>();
        order.sort_by_key(|&index| (Reverse(demands[index]), index));

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();

        for index in order {
            let seats = demands[index];
            // `free` is sorted by capacity, the first fit is the best fit.
            match free
                .iter()
                .position(|shuttle| shuttle.capacity as usize >= seats)
            {
                Some(position) => matched.push((index, free.remove(position))),
                None => unmatched.push(index),
            }
        }

        matched.sort_by_key(|&(index, _)| index);
        unmatched.sort();

        (matched, unmatched)
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;
    use crate::{
        problem::{
            ids::RouteId,
            location::Location,
            shuttle::{BookingKind, ShuttleStatus},
        },
        test_utils,
    };

    fn clusters(sizes: &[usize]) -> Vec<Cluster> {
        let mut next_id = 1;
        sizes
            .iter()
            .map(|&size| {
                let members = test_utils::create_members_around(
                    next_id,
                    size,
                    Location::from_cartesian(next_id as f64, 0.0),
                );
                next_id += size as u64;
                Cluster::new(members)
            })
            .collect()
    }

    #[test]
    fn test_best_fit_largest_first() {
        let shuttles = vec![
            test_utils::create_shuttle(1, 30),
            test_utils::create_shuttle(2, 8),
            test_utils::create_shuttle(3, 14),
        ];
        let shift = test_utils::create_shift(1);

        let allocation = ShuttleAllocator
            .allocate(&clusters(&[5, 12]), &shuttles, &[], &shift, date(2025, 6, 10))
            .unwrap();

        assert!(allocation.unallocated.is_empty());
        assert_eq!(
            allocation
                .assignments
                .iter()
                .map(|assignment| (assignment.cluster_index, assignment.shuttle_id.get()))
                .collect::<Vec<_>>(),
            vec![(0, 2), (1, 3)]
        );
    }

    #[test]
    fn test_more_clusters_than_shuttles() {
        let shuttles = vec![
            test_utils::create_shuttle(1, 14),
            test_utils::create_shuttle(2, 12),
        ];
        let shift = test_utils::create_shift(1);

        let allocation = ShuttleAllocator
            .allocate(&clusters(&[12, 12, 1]), &shuttles, &[], &shift, date(2025, 6, 10))
            .unwrap();

        assert_eq!(allocation.assignments.len(), 2);
        assert_eq!(allocation.unallocated.len(), 1);
        assert_eq!(allocation.unallocated[0].cluster_index, 2);
        assert_eq!(allocation.unallocated[0].employee_ids.len(), 1);
        assert_eq!(
            allocation.unallocated[0].reason,
            UnallocatedReason::NoEligibleShuttle
        );
    }

    #[test]
    fn test_too_small_shuttles_leave_cluster_unallocated() {
        let shuttles = vec![test_utils::create_shuttle(1, 4)];
        let shift = test_utils::create_shift(1);

        let allocation = ShuttleAllocator
            .allocate(&clusters(&[6]), &shuttles, &[], &shift, date(2025, 6, 10))
            .unwrap();

        assert!(allocation.assignments.is_empty());
        assert_eq!(allocation.unallocated.len(), 1);
    }

    #[test]
    fn test_maintenance_and_inactive_are_skipped() {
        let mut maintenance = test_utils::create_shuttle(1, 10);
        maintenance.status = ShuttleStatus::Maintenance;
        let mut inactive = test_utils::create_shuttle(2, 10);
        inactive.status = ShuttleStatus::Inactive;
        let available = test_utils::create_shuttle(3, 20);
        let shuttles = vec![maintenance, inactive, available];

        let shift = test_utils::create_shift(1);
        let allocation = ShuttleAllocator
            .allocate(&clusters(&[4]), &shuttles, &[], &shift, date(2025, 6, 10))
            .unwrap();

        assert_eq!(allocation.assignments[0].shuttle_id, ShuttleId::new(3));
    }

    #[test]
    fn test_overlapping_bookings_exclude_shuttle() {
        let shuttles = vec![
            test_utils::create_shuttle(1, 10),
            test_utils::create_shuttle(2, 10),
        ];
        let shift = test_utils::create_shift(1);
        let window = shift.window(date(2025, 6, 10)).unwrap();

        let bookings = vec![
            ShuttleBooking {
                shuttle_id: ShuttleId::new(1),
                window,
                kind: BookingKind::Route(RouteId::new(99)),
            },
            ShuttleBooking {
                shuttle_id: ShuttleId::new(2),
                window: shift.window(date(2025, 6, 11)).unwrap(),
                kind: BookingKind::Unavailable,
            },
        ];

        let eligible = ShuttleAllocator::eligible_shuttles(&shuttles, &bookings, &window);
        assert_eq!(
            eligible.iter().map(|shuttle| shuttle.id.get()).collect::<Vec<_>>(),
            vec![2]
        );
    }

    #[test]
    fn test_allocate_demands_ties_go_to_lower_index() {
        let shuttles = vec![test_utils::create_shuttle(1, 10)];
        let window = test_utils::create_shift(1).window(date(2025, 6, 10)).unwrap();

        let (matched, unmatched) =
            ShuttleAllocator.allocate_demands(&[3, 3], &shuttles, &[], &window);

        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].0, 0);
        assert_eq!(unmatched, vec![1]);
    }
}
