pub mod error;
pub mod plan;
pub mod planner;
pub mod problem;
pub mod recurring;
pub mod store;
mod utils;

pub mod json;

#[cfg(test)]
pub(crate) mod test_utils;
