use crate::define_id_newtype;

define_id_newtype!(OrganizationId);
define_id_newtype!(EmployeeId);
define_id_newtype!(DepartmentId);
define_id_newtype!(ShiftId);
define_id_newtype!(ShuttleId);
define_id_newtype!(DriverId);
define_id_newtype!(RouteId);
define_id_newtype!(StopId);
define_id_newtype!(TemplateId);
