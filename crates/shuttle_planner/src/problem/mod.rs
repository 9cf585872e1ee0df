pub mod distance_method;
pub mod employee;
pub mod ids;
pub mod kmh;
pub mod location;
pub mod meters;
pub mod shift;
pub mod shuttle;
pub mod time_window;
