use jiff::{Timestamp, civil::Time};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    problem::{
        distance_method::DistanceMethod,
        employee::Employee,
        ids::{DepartmentId, DriverId, EmployeeId, OrganizationId, ShiftId, ShuttleId, TemplateId},
        location::Location,
        shift::Shift,
        shuttle::{Shuttle, ShuttleStatus},
        time_window::TimeWindow,
    },
    recurring::route_template::{RouteTemplate, TemplateStop},
    store::in_memory::InMemoryStore,
};

/// Coordinates are `[lat, lon]` throughout.
#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Dataset")]
pub struct JsonDataset {
    pub organization_id: OrganizationId,
    pub headquarters: Option<[f64; 2]>,
    pub distance_method: Option<DistanceMethod>,
    pub shifts: Vec<JsonShift>,
    pub employees: Vec<JsonEmployee>,
    pub shuttles: Vec<JsonShuttle>,
    #[serde(default)]
    pub unavailability: Vec<JsonUnavailability>,
    #[serde(default)]
    pub templates: Vec<JsonTemplate>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Shift")]
pub struct JsonShift {
    pub id: ShiftId,
    pub name: String,
    pub start: Time,
    pub end: Time,
    /// IANA name, UTC when omitted.
    pub time_zone: Option<String>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Employee")]
pub struct JsonEmployee {
    pub id: EmployeeId,
    pub name: String,
    pub location: [f64; 2],
    pub shift_id: ShiftId,
    pub department_id: Option<DepartmentId>,
    pub active: Option<bool>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Shuttle")]
pub struct JsonShuttle {
    pub id: ShuttleId,
    pub name: Option<String>,
    pub capacity: u32,
    pub status: Option<ShuttleStatus>,
    pub driver_id: Option<DriverId>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Unavailability")]
pub struct JsonUnavailability {
    pub shuttle_id: ShuttleId,
    pub start: Timestamp,
    pub end: Timestamp,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "Template")]
pub struct JsonTemplate {
    pub id: TemplateId,
    pub name: String,
    pub shift_id: ShiftId,
    pub shuttle_id: Option<ShuttleId>,
    #[serde(default)]
    pub stops: Vec<JsonTemplateStop>,
    pub pool_employees: Option<bool>,
}

#[derive(Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields, rename = "TemplateStop")]
pub struct JsonTemplateStop {
    pub name: String,
    pub location: [f64; 2],
}

impl JsonDataset {
    pub fn headquarters(&self) -> Option<Location> {
        self.headquarters.map(Location::from)
    }

    pub fn load_into(&self, store: &InMemoryStore) {
        let organization_id = self.organization_id;

        for shift in &self.shifts {
            store.insert_shift(Shift {
                id: shift.id,
                organization_id,
                name: shift.name.clone(),
                start: shift.start,
                end: shift.end,
                time_zone: shift.time_zone.clone().unwrap_or_else(|| String::from("UTC")),
            });
        }

        for employee in &self.employees {
            store.insert_employee(Employee {
                id: employee.id,
                organization_id,
                name: employee.name.clone(),
                location: Location::from(employee.location),
                department_id: employee.department_id,
                shift_id: employee.shift_id,
                assigned: false,
                active: employee.active.unwrap_or(true),
            });
        }

        for shuttle in &self.shuttles {
            store.insert_shuttle(Shuttle {
                id: shuttle.id,
                organization_id,
                name: shuttle.name.clone(),
                capacity: shuttle.capacity,
                status: shuttle.status.unwrap_or(ShuttleStatus::Available),
                driver_id: shuttle.driver_id,
            });
        }

        for record in &self.unavailability {
            store.insert_unavailability(record.shuttle_id, TimeWindow::new(record.start, record.end));
        }
    }

    pub fn create_store(&self) -> InMemoryStore {
        let store = InMemoryStore::new();
        self.load_into(&store);
        store
    }

    pub fn route_templates(&self) -> Vec<RouteTemplate> {
        self.templates
            .iter()
            .map(|template| RouteTemplate {
                id: template.id,
                name: template.name.clone(),
                shift_id: template.shift_id,
                shuttle_id: template.shuttle_id,
                stops: template
                    .stops
                    .iter()
                    .map(|stop| TemplateStop {
                        name: stop.name.clone(),
                        location: Location::from(stop.location),
                    })
                    .collect(),
                pool_employees: template.pool_employees.unwrap_or(false),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use jiff::civil::date;

    use super::*;
    use crate::store::{EmployeeDirectory, ShiftDirectory, ShuttleDirectory};

    const DATASET: &str = r#"{
        "organization_id": 7,
        "headquarters": [9.0192, 38.7525],
        "shifts": [
            { "id": 1, "name": "Morning", "start": "08:00", "end": "16:00", "time_zone": "Africa/Addis_Ababa" }
        ],
        "employees": [
            { "id": 1, "name": "Abebe", "location": [9.0107, 38.7613], "shift_id": 1 },
            { "id": 2, "name": "Sara", "location": [8.9779, 38.7993], "shift_id": 1, "active": false }
        ],
        "shuttles": [
            { "id": 1, "capacity": 12, "driver_id": 3 },
            { "id": 2, "capacity": 14, "status": "maintenance" }
        ],
        "templates": [
            {
                "id": 1,
                "name": "Bole loop",
                "shift_id": 1,
                "stops": [{ "name": "Bole", "location": [8.9955, 38.7856] }]
            }
        ]
    }"#;

    #[test]
    fn test_load_dataset() {
        let dataset: JsonDataset = serde_json::from_str(DATASET).unwrap();
        let store = dataset.create_store();
        let organization_id = OrganizationId::new(7);

        let shift = store.shift(ShiftId::new(1)).unwrap().unwrap();
        assert_eq!(shift.organization_id, organization_id);
        assert_eq!(shift.time_zone, "Africa/Addis_Ababa");

        let employees = store
            .employees(organization_id, ShiftId::new(1), date(2025, 6, 10))
            .unwrap();
        assert_eq!(employees.len(), 2);
        assert!(employees[0].is_pending());
        assert!(!employees[1].is_pending());
        assert_eq!(employees[0].location.lat(), 9.0107);

        let shuttles = store.shuttles(organization_id).unwrap();
        assert_eq!(shuttles[1].status, ShuttleStatus::Maintenance);
        assert_eq!(shuttles[0].driver_id, Some(DriverId::new(3)));

        let templates = dataset.route_templates();
        assert_eq!(templates.len(), 1);
        assert!(!templates[0].pool_employees);
        assert_eq!(dataset.headquarters().map(|hq| hq.lon()), Some(38.7525));
    }

    #[test]
    fn test_unknown_fields_are_rejected() {
        let result = serde_json::from_str::<JsonShuttle>(r#"{ "id": 1, "capacity": 4, "seats": 4 }"#);

        assert!(result.is_err());
    }
}
