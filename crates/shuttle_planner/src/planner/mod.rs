pub mod cluster_builder;
pub mod geo_index;
pub mod planner_params;
pub mod planning_locks;
pub mod route_planner;
pub mod route_sequencer;
pub mod shuttle_allocator;
