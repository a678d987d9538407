//! Background execution loop.
//!
//! One spawned task polls the store on a fixed interval, executes due tasks
//! serially against the connector, and persists after every task so a crash
//! mid-pass loses at most the in-flight task's final transition. The cancel
//! signal is observed at the top of each pass, between tasks, and at the
//! poll wait; an in-flight transfer is never interrupted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::time;
use tracing::{debug, error, info, warn};

use ferry_core::traits::connector::{TransferConnector, TransferProgress};
use ferry_core::types::id::TaskId;
use ferry_entity::task::{ScheduledTask, TaskStatus, TaskType};

use crate::scheduler::SchedulerState;

/// Main loop: pass, then sleep until the next tick or cancellation.
///
/// The pass runs before the first sleep, so a task whose schedule is
/// already past when the scheduler starts executes immediately.
pub(crate) async fn run_loop(
    pass_guard: Arc<Mutex<()>>,
    state: Arc<Mutex<SchedulerState>>,
    connector: Arc<dyn TransferConnector>,
    poll: Duration,
    mut cancel: watch::Receiver<bool>,
) {
    info!("Scheduler runner started (poll every {:?})", poll);

    loop {
        if *cancel.borrow() {
            break;
        }

        run_pass(&pass_guard, &state, &connector, &cancel).await;

        tokio::select! {
            _ = cancel.changed() => {
                if *cancel.borrow() {
                    break;
                }
            }
            _ = time::sleep(poll) => {}
        }
    }

    info!("Scheduler runner stopped");
}

/// One pass: select due tasks and execute them serially.
///
/// Passes never overlap: the guard serializes the background loop's ticks
/// with caller-driven passes, so at most one task is ever in flight and
/// the running-task marker stays accurate.
pub(crate) async fn run_pass(
    pass_guard: &Arc<Mutex<()>>,
    state: &Arc<Mutex<SchedulerState>>,
    connector: &Arc<dyn TransferConnector>,
    cancel: &watch::Receiver<bool>,
) {
    let _pass = pass_guard.lock().await;
    let now = Utc::now();

    // Snapshot the due set; ties on schedule break by id for determinism.
    let due: Vec<TaskId> = {
        let guard = state.lock().await;
        let mut due: Vec<&ScheduledTask> =
            guard.store.iter().filter(|t| t.is_due(now)).collect();
        due.sort_by(|a, b| a.scheduled_at.cmp(&b.scheduled_at).then(a.id.cmp(&b.id)));
        due.iter().map(|t| t.id).collect()
    };

    if due.is_empty() {
        return;
    }
    debug!("{} task(s) due", due.len());

    for id in due {
        if *cancel.borrow() {
            debug!("Stop requested; leaving remaining due tasks for the next start");
            break;
        }
        execute_task(state, connector, id).await;
    }
}

/// Execute a single task: claim it, dispatch outside the lock, record the
/// outcome, persist.
async fn execute_task(
    state: &Arc<Mutex<SchedulerState>>,
    connector: &Arc<dyn TransferConnector>,
    id: TaskId,
) {
    // Claim under the lock; the record may have been removed or mutated
    // since the due set was snapshotted.
    let task = {
        let mut guard = state.lock().await;
        let Some(task) = guard.store.get_mut(id) else {
            return;
        };
        if task.status != TaskStatus::Pending {
            return;
        }
        task.status = TaskStatus::Running;
        let snapshot = task.clone();
        guard.running_task = Some(id);
        if let Err(e) = guard.store.save().await {
            warn!("Failed to persist running state for task {id}: {e}");
        }
        snapshot
    };

    info!(
        "Executing task: id={}, type='{}', source='{}'",
        id, task.task_type, task.source
    );

    // The transfer itself runs without the lock so add/remove/list stay
    // responsive during a long transfer.
    let result = dispatch(connector, &task).await;
    let finished = Utc::now();

    let mut guard = state.lock().await;
    guard.running_task = None;
    if let Some(task) = guard.store.get_mut(id) {
        task.last_run_at = Some(finished);
        match &result {
            Ok(()) => {
                task.last_error = None;
                // A recurring record without a positive interval can only
                // come from a hand-edited file; treat it as one-shot rather
                // than rescheduling it to "now" on every tick.
                match task.interval_minutes.filter(|m| *m > 0) {
                    Some(minutes) if task.recurring => {
                        task.scheduled_at = finished + chrono::Duration::minutes(i64::from(minutes));
                        task.status = TaskStatus::Pending;
                        info!("Task {} completed; next run at {}", id, task.scheduled_at);
                    }
                    _ => {
                        if task.recurring {
                            warn!("Task {id} is marked recurring but has no interval; completing it");
                        }
                        task.status = TaskStatus::Completed;
                        info!("Task {} completed", id);
                    }
                }
            }
            Err(e) => {
                task.status = TaskStatus::Failed;
                task.last_error = Some(e.message.clone());
                error!("Task {} failed: {}", id, e.message);
            }
        }
    }
    if let Err(e) = guard.store.save().await {
        warn!("Failed to persist outcome of task {id}: {e}");
    }
}

/// Invoke the connector operation for the task's type.
async fn dispatch(
    connector: &Arc<dyn TransferConnector>,
    task: &ScheduledTask,
) -> ferry_core::AppResult<()> {
    match task.task_type {
        TaskType::Upload => {
            let destination = task.destination.as_deref().unwrap_or_default();
            connector
                .upload(&task.source, destination, Some(progress_logger(task.id)))
                .await
        }
        TaskType::Download => {
            let destination = task.destination.as_deref().unwrap_or_default();
            connector
                .download(&task.source, destination, Some(progress_logger(task.id)))
                .await
        }
        TaskType::Delete => connector.delete(&task.source).await,
    }
}

/// Spawn a consumer that logs progress events for one transfer.
///
/// The returned sender is handed to the connector; the consumer ends when
/// the connector drops it at completion or failure.
fn progress_logger(id: TaskId) -> mpsc::UnboundedSender<TransferProgress> {
    let (tx, mut rx) = mpsc::unbounded_channel::<TransferProgress>();
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            debug!(
                task = %id,
                bytes_done = event.bytes_done,
                bytes_total = event.bytes_total,
                "transfer progress"
            );
        }
    });
    tx
}
