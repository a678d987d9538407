//! Task type and status enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of remote file operation a task performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskType {
    /// Transfer a local file to the remote endpoint.
    Upload,
    /// Transfer a remote file to the local filesystem.
    Download,
    /// Delete a file on the remote endpoint.
    Delete,
}

impl TaskType {
    /// Whether this task kind requires a destination path.
    pub fn requires_destination(&self) -> bool {
        !matches!(self, Self::Delete)
    }

    /// Return the type as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Download => "download",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TaskType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "upload" => Ok(Self::Upload),
            "download" => Ok(Self::Download),
            "delete" => Ok(Self::Delete),
            other => Err(format!("unknown task type '{other}'")),
        }
    }
}

/// Execution status of a scheduled task.
///
/// Transitions are `Pending → Running → {Completed, Failed}`; a recurring
/// task that completes successfully returns to `Pending` with an advanced
/// schedule. A `Failed` recurring task stays failed until explicitly
/// re-added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for its scheduled time.
    Pending,
    /// Currently being executed against the connector.
    Running,
    /// Successfully completed (non-recurring tasks only).
    Completed,
    /// Failed; `last_error` carries the message.
    Failed,
}

impl TaskStatus {
    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
