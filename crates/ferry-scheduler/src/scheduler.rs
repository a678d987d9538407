//! Caller-facing scheduler control surface.
//!
//! `TaskScheduler` owns the task store and the background runner. It is the
//! sole mutator of task state after creation: console/CLI threads call
//! `add`/`remove`/`list` concurrently with the background pass, all
//! synchronized through one lock around the store. Add and Remove persist
//! immediately and never block on remote I/O; List only copies the record
//! set.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use ferry_core::config::scheduler::SchedulerConfig;
use ferry_core::error::AppError;
use ferry_core::result::AppResult;
use ferry_core::traits::connector::TransferConnector;
use ferry_core::types::id::TaskId;
use ferry_entity::task::{ScheduledTask, TaskStatus, TaskType};

use crate::runner;
use crate::store::TaskStore;

/// Parameters for creating a new scheduled task.
#[derive(Debug, Clone)]
pub struct TaskCreateParams {
    /// Kind of operation.
    pub task_type: TaskType,
    /// Origin path: local for Upload, remote for Download/Delete.
    pub source: String,
    /// Target path; required unless `task_type` is Delete.
    pub destination: Option<String>,
    /// First eligibility time (`None` = now).
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Whether the task reschedules itself after each successful run.
    pub recurring: bool,
    /// Reschedule interval; required and positive when `recurring`.
    pub interval_minutes: Option<u32>,
}

/// Store plus in-flight bookkeeping, guarded by a single lock.
#[derive(Debug)]
pub(crate) struct SchedulerState {
    /// The durable record set.
    pub(crate) store: TaskStore,
    /// Id of the task currently executing, if any.
    pub(crate) running_task: Option<TaskId>,
}

/// Handle to the spawned background runner.
#[derive(Debug)]
struct RunnerHandle {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

/// Manages scheduled transfer tasks and the background execution loop.
///
/// Clone-cheap: clones share the same store and runner.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    state: Arc<Mutex<SchedulerState>>,
    connector: Arc<dyn TransferConnector>,
    config: SchedulerConfig,
    runner: Arc<Mutex<Option<RunnerHandle>>>,
    /// Serializes scheduling passes; held for the duration of each pass so
    /// the background loop and `run_pending` callers never overlap.
    pass_guard: Arc<Mutex<()>>,
}

impl TaskScheduler {
    /// Create a new scheduler over a loaded store and a connector.
    pub fn new(
        store: TaskStore,
        connector: Arc<dyn TransferConnector>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(SchedulerState {
                store,
                running_task: None,
            })),
            connector,
            config,
            runner: Arc::new(Mutex::new(None)),
            pass_guard: Arc::new(Mutex::new(())),
        }
    }

    /// Create and persist a new task.
    ///
    /// Validates the request, assigns a fresh id, and saves the store before
    /// returning. On a persistence failure the task stays scheduled in
    /// memory and the error is surfaced to the caller; the next successful
    /// save writes it out.
    pub async fn add(&self, params: TaskCreateParams) -> AppResult<ScheduledTask> {
        validate(&params)?;

        let now = Utc::now();
        let task = ScheduledTask {
            id: TaskId::new(),
            task_type: params.task_type,
            source: params.source,
            destination: if params.task_type.requires_destination() {
                params.destination
            } else {
                None
            },
            scheduled_at: params.scheduled_at.unwrap_or(now),
            recurring: params.recurring,
            interval_minutes: if params.recurring {
                params.interval_minutes
            } else {
                None
            },
            status: TaskStatus::Pending,
            last_run_at: None,
            last_error: None,
            created_at: now,
        };

        let mut state = self.state.lock().await;
        state.store.add(task.clone())?;
        state.store.save().await?;

        info!(
            "Added task: id={}, type='{}', scheduled_at={}, recurring={}",
            task.id, task.task_type, task.scheduled_at, task.recurring
        );
        Ok(task)
    }

    /// Remove a task by id and persist the store.
    ///
    /// Rejected with `TaskRunning` while the task is executing; the caller
    /// retries once the in-flight run has finished.
    pub async fn remove(&self, id: TaskId) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state.running_task == Some(id) {
            return Err(AppError::task_running(format!(
                "Task {id} is currently executing; retry after it finishes"
            )));
        }
        state.store.remove(id)?;
        state.store.save().await?;

        info!("Removed task: id={}", id);
        Ok(())
    }

    /// Snapshot of all task records in insertion order.
    pub async fn list(&self) -> Vec<ScheduledTask> {
        self.state.lock().await.store.list()
    }

    /// Snapshot of a single task record.
    pub async fn get(&self, id: TaskId) -> AppResult<ScheduledTask> {
        self.state
            .lock()
            .await
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("Task {id} not found")))
    }

    /// Start the background loop; idempotent.
    pub async fn start(&self) {
        let mut runner = self.runner.lock().await;
        if let Some(handle) = runner.as_ref()
            && !handle.handle.is_finished()
        {
            warn!("Scheduler already running");
            return;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let pass_guard = Arc::clone(&self.pass_guard);
        let state = Arc::clone(&self.state);
        let connector = Arc::clone(&self.connector);
        let poll = std::time::Duration::from_secs(self.config.poll_interval_seconds);
        let handle = tokio::spawn(runner::run_loop(pass_guard, state, connector, poll, cancel_rx));

        *runner = Some(RunnerHandle {
            cancel: cancel_tx,
            handle,
        });
        info!(
            "Scheduler started (poll interval {}s)",
            self.config.poll_interval_seconds
        );
    }

    /// Signal the background loop to stop and wait for the current pass to
    /// reach a safe point; idempotent. Never interrupts a transfer already
    /// in progress.
    pub async fn stop(&self) {
        let handle = self.runner.lock().await.take();
        let Some(RunnerHandle { cancel, handle }) = handle else {
            return;
        };

        let _ = cancel.send(true);
        if let Err(e) = handle.await {
            warn!("Scheduler runner task ended abnormally: {e}");
        }
        info!("Scheduler stopped");
    }

    /// Execute one scheduling pass, letting callers and tests drive the
    /// scheduler without waiting for the poll interval.
    ///
    /// Passes are serialized: if the background loop (or another caller) is
    /// mid-pass, this waits for that pass to finish before running its own.
    pub async fn run_pending(&self) {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        runner::run_pass(&self.pass_guard, &self.state, &self.connector, &cancel_rx).await;
    }
}

fn validate(params: &TaskCreateParams) -> AppResult<()> {
    if params.source.trim().is_empty() {
        return Err(AppError::validation("Source path must not be empty"));
    }
    if params.task_type.requires_destination() {
        match &params.destination {
            Some(dest) if !dest.trim().is_empty() => {}
            _ => {
                return Err(AppError::validation(format!(
                    "Destination path is required for {} tasks",
                    params.task_type
                )));
            }
        }
    }
    if params.recurring {
        match params.interval_minutes {
            Some(minutes) if minutes > 0 => {}
            _ => {
                return Err(AppError::validation(
                    "Recurring tasks require a positive interval_minutes",
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use ferry_core::error::ErrorKind;
    use ferry_core::traits::connector::{ProgressSender, RemoteEntry};

    /// Connector stub that records calls and can fail or block on demand.
    #[derive(Debug, Default)]
    struct StubConnector {
        fail_with: Option<String>,
        hold: Option<Arc<Notify>>,
        calls: StdMutex<Vec<String>>,
        call_count: AtomicUsize,
    }

    impl StubConnector {
        fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::default()
            }
        }

        fn held(notify: Arc<Notify>) -> Self {
            Self {
                hold: Some(notify),
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        async fn record(&self, op: &str, path: &str) -> AppResult<()> {
            self.calls.lock().unwrap().push(format!("{op} {path}"));
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.hold {
                gate.notified().await;
            }
            match &self.fail_with {
                Some(message) => Err(AppError::transfer(message.clone())),
                None => Ok(()),
            }
        }
    }

    #[async_trait]
    impl TransferConnector for StubConnector {
        fn connector_type(&self) -> &str {
            "stub"
        }

        async fn connect(&self) -> AppResult<()> {
            Ok(())
        }

        async fn disconnect(&self) {}

        async fn upload(
            &self,
            local_path: &str,
            _remote_path: &str,
            _progress: Option<ProgressSender>,
        ) -> AppResult<()> {
            self.record("upload", local_path).await
        }

        async fn download(
            &self,
            remote_path: &str,
            _local_path: &str,
            _progress: Option<ProgressSender>,
        ) -> AppResult<()> {
            self.record("download", remote_path).await
        }

        async fn delete(&self, remote_path: &str) -> AppResult<()> {
            self.record("delete", remote_path).await
        }

        async fn list(&self, _remote_dir: &str) -> AppResult<Vec<RemoteEntry>> {
            Ok(Vec::new())
        }
    }

    fn upload_params(source: &str) -> TaskCreateParams {
        TaskCreateParams {
            task_type: TaskType::Upload,
            source: source.to_string(),
            destination: Some(format!("/remote{source}")),
            scheduled_at: None,
            recurring: false,
            interval_minutes: None,
        }
    }

    async fn scheduler_with(
        connector: Arc<StubConnector>,
        dir: &tempfile::TempDir,
    ) -> TaskScheduler {
        let store = TaskStore::load(dir.path().join("tasks.json")).await;
        TaskScheduler::new(store, connector, SchedulerConfig::default())
    }

    #[tokio::test]
    async fn test_add_assigns_unique_ids_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler_with(Arc::new(StubConnector::default()), &dir).await;

        let a = scheduler.add(upload_params("/tmp/a.txt")).await.unwrap();
        let b = scheduler.add(upload_params("/tmp/b.txt")).await.unwrap();
        assert_ne!(a.id, b.id);
        assert!(dir.path().join("tasks.json").exists());

        // A fresh load sees both records.
        let reloaded = TaskStore::load(dir.path().join("tasks.json")).await;
        assert_eq!(reloaded.len(), 2);
    }

    #[tokio::test]
    async fn test_add_validation_errors() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = scheduler_with(Arc::new(StubConnector::default()), &dir).await;

        let mut missing_dest = upload_params("/tmp/a.txt");
        missing_dest.destination = None;
        let err = scheduler.add(missing_dest).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let mut no_interval = upload_params("/tmp/a.txt");
        no_interval.recurring = true;
        let err = scheduler.add(no_interval).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let mut zero_interval = upload_params("/tmp/a.txt");
        zero_interval.recurring = true;
        zero_interval.interval_minutes = Some(0);
        let err = scheduler.add(zero_interval).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        assert!(scheduler.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_task_needs_no_destination() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(StubConnector::default());
        let scheduler = scheduler_with(Arc::clone(&connector), &dir).await;

        let task = scheduler
            .add(TaskCreateParams {
                task_type: TaskType::Delete,
                source: "/remote/old.log".to_string(),
                destination: None,
                scheduled_at: None,
                recurring: false,
                interval_minutes: None,
            })
            .await
            .unwrap();
        assert!(task.destination.is_none());

        scheduler.run_pending().await;
        assert_eq!(connector.calls(), vec!["delete /remote/old.log"]);
    }

    #[tokio::test]
    async fn test_successful_upload_completes() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(StubConnector::default());
        let scheduler = scheduler_with(Arc::clone(&connector), &dir).await;

        let task = scheduler.add(upload_params("/tmp/a.txt")).await.unwrap();
        scheduler.run_pending().await;

        let task = scheduler.get(task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.last_error.is_none());
        assert!(task.last_run_at.is_some());
    }

    #[tokio::test]
    async fn test_failed_transfer_records_error() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(StubConnector::failing("connection refused"));
        let scheduler = scheduler_with(connector, &dir).await;

        let task = scheduler.add(upload_params("/tmp/a.txt")).await.unwrap();
        scheduler.run_pending().await;

        let task = scheduler.get(task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.last_error.as_deref(), Some("connection refused"));
    }

    #[tokio::test]
    async fn test_recurring_task_reschedules_from_completion() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(StubConnector::default());
        let scheduler = scheduler_with(connector, &dir).await;

        let mut params = upload_params("/tmp/a.txt");
        params.recurring = true;
        params.interval_minutes = Some(15);
        let task = scheduler.add(params).await.unwrap();

        scheduler.run_pending().await;

        let task = scheduler.get(task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        let completion = task.last_run_at.unwrap();
        assert_eq!(task.scheduled_at, completion + chrono::Duration::minutes(15));
    }

    #[tokio::test]
    async fn test_non_recurring_task_never_reruns() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(StubConnector::default());
        let scheduler = scheduler_with(Arc::clone(&connector), &dir).await;

        scheduler.add(upload_params("/tmp/a.txt")).await.unwrap();
        scheduler.run_pending().await;
        scheduler.run_pending().await;

        assert_eq!(connector.call_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_recurring_task_does_not_resume() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(StubConnector::failing("connection refused"));
        let scheduler = scheduler_with(Arc::clone(&connector), &dir).await;

        let mut params = upload_params("/tmp/a.txt");
        params.recurring = true;
        params.interval_minutes = Some(1);
        let task = scheduler.add(params).await.unwrap();

        scheduler.run_pending().await;
        scheduler.run_pending().await;

        assert_eq!(connector.call_count.load(Ordering::SeqCst), 1);
        let task = scheduler.get(task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
    }

    #[tokio::test]
    async fn test_due_tasks_execute_in_schedule_order() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(StubConnector::default());
        let scheduler = scheduler_with(Arc::clone(&connector), &dir).await;

        let now = Utc::now();
        let mut second = upload_params("/tmp/second.txt");
        second.scheduled_at = Some(now - chrono::Duration::minutes(5));
        let mut first = upload_params("/tmp/first.txt");
        first.scheduled_at = Some(now - chrono::Duration::minutes(10));

        scheduler.add(second).await.unwrap();
        scheduler.add(first).await.unwrap();
        scheduler.run_pending().await;

        assert_eq!(
            connector.calls(),
            vec!["upload /tmp/first.txt", "upload /tmp/second.txt"]
        );
    }

    #[tokio::test]
    async fn test_remove_while_running_is_rejected_then_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());
        let connector = Arc::new(StubConnector::held(Arc::clone(&gate)));
        let scheduler = scheduler_with(connector, &dir).await;

        let task = scheduler.add(upload_params("/tmp/a.txt")).await.unwrap();

        let pass = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run_pending().await })
        };

        // Wait until the pass has marked the task running.
        loop {
            let snapshot = scheduler.get(task.id).await.unwrap();
            if snapshot.status == TaskStatus::Running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let err = scheduler.remove(task.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TaskRunning);

        gate.notify_one();
        pass.await.unwrap();

        scheduler.remove(task.id).await.unwrap();
        assert!(scheduler.list().await.is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_passes_run_one_task_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());
        let connector = Arc::new(StubConnector::held(Arc::clone(&gate)));
        let scheduler = scheduler_with(Arc::clone(&connector), &dir).await;

        let now = Utc::now();
        let mut first = upload_params("/tmp/first.txt");
        first.scheduled_at = Some(now - chrono::Duration::minutes(10));
        let mut second = upload_params("/tmp/second.txt");
        second.scheduled_at = Some(now - chrono::Duration::minutes(5));
        let first = scheduler.add(first).await.unwrap();
        let second = scheduler.add(second).await.unwrap();

        // Two passes racing over the same due set.
        let passes: Vec<_> = (0..2)
            .map(|_| {
                let scheduler = scheduler.clone();
                tokio::spawn(async move { scheduler.run_pending().await })
            })
            .collect();

        loop {
            if scheduler.get(first.id).await.unwrap().status == TaskStatus::Running {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        // Give the queued pass room to (incorrectly) claim the second task.
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Only one transfer is in flight; the other pass is waiting its turn.
        assert_eq!(connector.call_count.load(Ordering::SeqCst), 1);
        assert_eq!(
            scheduler.get(second.id).await.unwrap().status,
            TaskStatus::Pending
        );

        // The in-flight task is still protected from removal.
        let err = scheduler.remove(first.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::TaskRunning);

        gate.notify_one();
        loop {
            if connector.call_count.load(Ordering::SeqCst) == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        gate.notify_one();
        for pass in passes {
            pass.await.unwrap();
        }

        assert_eq!(
            connector.calls(),
            vec!["upload /tmp/first.txt", "upload /tmp/second.txt"]
        );
        assert_eq!(
            scheduler.get(first.id).await.unwrap().status,
            TaskStatus::Completed
        );
        assert_eq!(
            scheduler.get(second.id).await.unwrap().status,
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_recurring_record_without_interval_runs_once() {
        let dir = tempfile::tempdir().unwrap();

        // A hand-edited state file can claim recurring with no interval;
        // such a record must not reschedule itself to "now" forever.
        let mut store = TaskStore::empty(dir.path().join("tasks.json"));
        let task = ScheduledTask {
            id: TaskId::new(),
            task_type: TaskType::Upload,
            source: "/tmp/a.txt".to_string(),
            destination: Some("/remote/a.txt".to_string()),
            scheduled_at: Utc::now() - chrono::Duration::minutes(1),
            recurring: true,
            interval_minutes: None,
            status: TaskStatus::Pending,
            last_run_at: None,
            last_error: None,
            created_at: Utc::now(),
        };
        store.add(task.clone()).unwrap();

        let connector = Arc::new(StubConnector::default());
        let scheduler_connector: Arc<dyn TransferConnector> = connector.clone();
        let scheduler =
            TaskScheduler::new(store, scheduler_connector, SchedulerConfig::default());

        scheduler.run_pending().await;
        scheduler.run_pending().await;

        assert_eq!(connector.call_count.load(Ordering::SeqCst), 1);
        assert_eq!(
            scheduler.get(task.id).await.unwrap().status,
            TaskStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_concurrent_mutations_during_pass_keep_store_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let gate = Arc::new(Notify::new());
        let connector = Arc::new(StubConnector::held(Arc::clone(&gate)));
        let scheduler = scheduler_with(connector, &dir).await;

        let running = scheduler.add(upload_params("/tmp/busy.txt")).await.unwrap();

        let pass = {
            let scheduler = scheduler.clone();
            tokio::spawn(async move { scheduler.run_pending().await })
        };

        // Interleave adds, lists, and removes with the in-flight transfer.
        let mut writers = Vec::new();
        for i in 0..16 {
            let scheduler = scheduler.clone();
            writers.push(tokio::spawn(async move {
                let task = scheduler
                    .add(upload_params(&format!("/tmp/file-{i}.txt")))
                    .await
                    .unwrap();
                let _ = scheduler.list().await;
                if i % 4 == 0 {
                    scheduler.remove(task.id).await.unwrap();
                    None
                } else {
                    Some(task.id)
                }
            }));
        }

        let mut kept = Vec::new();
        for writer in writers {
            if let Some(id) = writer.await.unwrap() {
                kept.push(id);
            }
        }

        gate.notify_one();
        pass.await.unwrap();

        let tasks = scheduler.list().await;
        assert_eq!(tasks.len(), kept.len() + 1);
        let mut ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), tasks.len());
        assert!(tasks.iter().any(|t| t.id == running.id));
    }

    #[tokio::test]
    async fn test_future_task_is_not_executed() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(StubConnector::default());
        let scheduler = scheduler_with(Arc::clone(&connector), &dir).await;

        let mut params = upload_params("/tmp/later.txt");
        params.scheduled_at = Some(Utc::now() + chrono::Duration::hours(1));
        let task = scheduler.add(params).await.unwrap();

        scheduler.run_pending().await;

        assert_eq!(connector.call_count.load(Ordering::SeqCst), 0);
        let task = scheduler.get(task.id).await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
    }
}
