pub mod recurring_generator;
pub mod route_template;
pub mod weekday_mask;
