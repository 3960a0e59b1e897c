pub mod analytics;
pub mod attendance;
pub mod batches;
pub mod core;
pub mod students;
