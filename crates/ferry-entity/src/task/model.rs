//! Scheduled task entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ferry_core::types::id::TaskId;

use super::status::{TaskStatus, TaskType};

/// One scheduled transfer operation and its execution state.
///
/// Identity fields (`id`, `task_type`, `source`, `destination`, `recurring`,
/// `interval_minutes`, `created_at`) are fixed at creation; the remaining
/// fields are mutated only by the scheduler's background pass. Records are
/// persisted as a JSON array; unknown extra fields in the file are ignored
/// on load to tolerate forward-compatible additions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    /// Unique task identifier, never reused.
    pub id: TaskId,
    /// Kind of operation.
    pub task_type: TaskType,
    /// Origin path: local for Upload, remote for Download/Delete.
    pub source: String,
    /// Target path: required for Upload/Download, `None` for Delete.
    pub destination: Option<String>,
    /// When the task first becomes eligible to run.
    pub scheduled_at: DateTime<Utc>,
    /// Whether the task reschedules itself after a successful run.
    pub recurring: bool,
    /// Reschedule interval; present and positive iff `recurring`.
    pub interval_minutes: Option<u32>,
    /// Current execution status.
    pub status: TaskStatus,
    /// Timestamp of the most recent execution attempt.
    pub last_run_at: Option<DateTime<Utc>>,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
}

impl ScheduledTask {
    /// Whether the task is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.status == TaskStatus::Pending && self.scheduled_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ScheduledTask {
        ScheduledTask {
            id: TaskId::new(),
            task_type: TaskType::Upload,
            source: "/tmp/a.txt".to_string(),
            destination: Some("/remote/a.txt".to_string()),
            scheduled_at: Utc::now(),
            recurring: true,
            interval_minutes: Some(15),
            status: TaskStatus::Pending,
            last_run_at: None,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_json_round_trip() {
        let task = sample();
        let json = serde_json::to_string_pretty(&task).unwrap();
        let back: ScheduledTask = serde_json::from_str(&json).unwrap();
        assert_eq!(task, back);
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let task = sample();
        let mut value = serde_json::to_value(&task).unwrap();
        value["retention_days"] = serde_json::json!(30);
        let back: ScheduledTask = serde_json::from_value(value).unwrap();
        assert_eq!(task, back);
    }

    #[test]
    fn test_is_due() {
        let mut task = sample();
        let now = Utc::now();
        task.scheduled_at = now - chrono::Duration::minutes(1);
        assert!(task.is_due(now));

        task.scheduled_at = now + chrono::Duration::minutes(1);
        assert!(!task.is_due(now));

        task.scheduled_at = now;
        task.status = TaskStatus::Completed;
        assert!(!task.is_due(now));
    }
}
