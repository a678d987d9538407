//! Scheduled task entity.

pub mod model;
pub mod status;

pub use model::ScheduledTask;
pub use status::{TaskStatus, TaskType};
