use jiff::civil::time;

use crate::{
    planner::{cluster_builder::ClusterMember, planner_params::PlannerParams},
    problem::{
        distance_method::DistanceMethod,
        employee::Employee,
        ids::{EmployeeId, OrganizationId, ShiftId, ShuttleId},
        location::Location,
        shift::Shift,
        shuttle::{Shuttle, ShuttleStatus},
    },
    store::in_memory::InMemoryStore,
};

/// Euclidean distances so that coordinates read as plain meters.
pub fn planar_params() -> PlannerParams {
    PlannerParams {
        distance_method: DistanceMethod::Euclidean,
        ..PlannerParams::default()
    }
}

pub fn create_members(points: Vec<(u64, f64, f64)>) -> Vec<ClusterMember> {
    points
        .into_iter()
        .map(|(id, x, y)| ClusterMember {
            employee_id: EmployeeId::new(id),
            location: Location::from_cartesian(x, y),
        })
        .collect()
}

pub fn create_members_at(count: usize, location: Location) -> Vec<ClusterMember> {
    (1..=count as u64)
        .map(|id| ClusterMember {
            employee_id: EmployeeId::new(id),
            location,
        })
        .collect()
}

/// `count` members on a unit circle around `center`.
pub fn create_members_around(first_id: u64, count: usize, center: Location) -> Vec<ClusterMember> {
    (0..count)
        .map(|index| {
            let angle = std::f64::consts::TAU * index as f64 / count as f64;
            ClusterMember {
                employee_id: EmployeeId::new(first_id + index as u64),
                location: Location::from_cartesian(
                    center.x() + angle.cos(),
                    center.y() + angle.sin(),
                ),
            }
        })
        .collect()
}

/// Members on a grid with a spacing of one, ids row by row from 1.
pub fn create_grid_members(rows: usize, cols: usize) -> Vec<ClusterMember> {
    (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .enumerate()
        .map(|(index, (row, col))| ClusterMember {
            employee_id: EmployeeId::new(index as u64 + 1),
            location: Location::from_cartesian(col as f64, row as f64),
        })
        .collect()
}

pub fn create_shift(id: u64) -> Shift {
    Shift {
        id: ShiftId::new(id),
        organization_id: OrganizationId::new(1),
        name: format!("Shift {id}"),
        start: time(8, 0, 0, 0),
        end: time(16, 0, 0, 0),
        time_zone: String::from("UTC"),
    }
}

pub fn create_shuttle(id: u64, capacity: u32) -> Shuttle {
    Shuttle {
        id: ShuttleId::new(id),
        organization_id: OrganizationId::new(1),
        name: Some(format!("Shuttle {id}")),
        capacity,
        status: ShuttleStatus::Available,
        driver_id: None,
    }
}

pub fn create_employee(id: u64, x: f64, y: f64) -> Employee {
    Employee {
        id: EmployeeId::new(id),
        organization_id: OrganizationId::new(1),
        name: format!("Employee {id}"),
        location: Location::from_cartesian(x, y),
        department_id: None,
        shift_id: ShiftId::new(1),
        assigned: false,
        active: true,
    }
}

/// Store with shift 1 and the given `(id, capacity)` shuttles.
pub fn create_store(shuttles: &[(u64, u32)]) -> InMemoryStore {
    let store = InMemoryStore::new();
    store.insert_shift(create_shift(1));
    for &(id, capacity) in shuttles {
        store.insert_shuttle(create_shuttle(id, capacity));
    }
    store
}

pub fn insert_grid_employees(store: &InMemoryStore, rows: usize, cols: usize) {
    for member in create_grid_members(rows, cols) {
        store.insert_employee(create_employee(
            member.employee_id.get(),
            member.location.x(),
            member.location.y(),
        ));
    }
}
