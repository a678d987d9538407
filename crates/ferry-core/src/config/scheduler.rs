//! Task scheduler configuration.

use serde::{Deserialize, Serialize};

/// Background task scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Whether the background scheduler is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Interval in seconds between due-task polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Path to the durable task state file.
    #[serde(default = "default_tasks_file")]
    pub tasks_file: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            poll_interval_seconds: default_poll_interval(),
            tasks_file: default_tasks_file(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_poll_interval() -> u64 {
    10
}

fn default_tasks_file() -> String {
    "data/scheduled_tasks.json".to_string()
}
