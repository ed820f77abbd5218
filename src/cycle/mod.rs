pub mod orchestrator;
pub mod scheduler;

pub use orchestrator::{CycleRunner, CycleSettings};
pub use scheduler::{CycleJob, CycleScheduler};
