//! Durable task store.
//!
//! Holds the full record set in memory and serializes it to a JSON file.
//! Saves are atomic (write to a temporary file, then rename) so a crash
//! mid-write never yields truncated state. Loading never fails startup: a
//! missing or malformed file degrades to an empty store, and a malformed
//! file is left untouched on disk until the next successful save.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use ferry_core::error::AppError;
use ferry_core::result::AppResult;
use ferry_core::types::id::TaskId;
use ferry_entity::task::ScheduledTask;

/// Ordered, durable mapping from task id to task record.
///
/// Insertion order is preserved for listing but carries no semantic weight.
#[derive(Debug)]
pub struct TaskStore {
    /// Path of the JSON state file.
    path: PathBuf,
    /// All records, in insertion order.
    records: Vec<ScheduledTask>,
}

impl TaskStore {
    /// Load the store from `path`.
    ///
    /// A missing file yields an empty store; an unreadable or malformed file
    /// is logged and likewise yields an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match fs::read(&path).await {
            Ok(bytes) => match serde_json::from_slice::<Vec<ScheduledTask>>(&bytes) {
                Ok(records) => {
                    debug!("Loaded {} tasks from {}", records.len(), path.display());
                    records
                }
                Err(e) => {
                    warn!(
                        "Task file {} is malformed ({}); starting with an empty store, \
                         file left in place",
                        path.display(),
                        e
                    );
                    Vec::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                warn!(
                    "Failed to read task file {} ({}); starting with an empty store",
                    path.display(),
                    e
                );
                Vec::new()
            }
        };
        Self { path, records }
    }

    /// Create an empty store that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            records: Vec::new(),
        }
    }

    /// Path of the backing state file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the full record set atomically.
    pub async fn save(&self) -> AppResult<()> {
        let data = serde_json::to_vec_pretty(&self.records)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::persistence(format!(
                    "Failed to create state directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let tmp = self.tmp_path();
        fs::write(&tmp, &data).await.map_err(|e| {
            AppError::persistence(format!("Failed to write {}: {e}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).await.map_err(|e| {
            AppError::persistence(format!(
                "Failed to replace {}: {e}",
                self.path.display()
            ))
        })?;

        debug!("Saved {} tasks to {}", self.records.len(), self.path.display());
        Ok(())
    }

    /// Add a record; fails with `Duplicate` if the id already exists.
    pub fn add(&mut self, task: ScheduledTask) -> AppResult<()> {
        if self.records.iter().any(|t| t.id == task.id) {
            return Err(AppError::duplicate(format!(
                "Task {} already exists",
                task.id
            )));
        }
        self.records.push(task);
        Ok(())
    }

    /// Remove a record by id; fails with `NotFound` if absent.
    pub fn remove(&mut self, id: TaskId) -> AppResult<ScheduledTask> {
        match self.records.iter().position(|t| t.id == id) {
            Some(idx) => Ok(self.records.remove(idx)),
            None => Err(AppError::not_found(format!("Task {id} not found"))),
        }
    }

    /// Look up a record by id.
    pub fn get(&self, id: TaskId) -> Option<&ScheduledTask> {
        self.records.iter().find(|t| t.id == id)
    }

    /// Look up a record by id for mutation.
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut ScheduledTask> {
        self.records.iter_mut().find(|t| t.id == id)
    }

    /// Snapshot of all records in insertion order.
    pub fn list(&self) -> Vec<ScheduledTask> {
        self.records.clone()
    }

    /// Iterate over records without cloning.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.records.iter()
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn tmp_path(&self) -> PathBuf {
        let mut raw: OsString = self.path.clone().into_os_string();
        raw.push(".tmp");
        PathBuf::from(raw)
    }
}
