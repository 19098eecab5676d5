pub mod mirror;
pub mod model;
pub mod schedule;
pub mod scheduler;

pub use mirror::MissionMirror;
pub use model::{DurationUnit, Mission, TriggerEvent};
pub use schedule::calc_after_timestamp;
pub use scheduler::Scheduler;
