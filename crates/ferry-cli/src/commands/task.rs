//! Scheduled task management commands.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use ferry_core::error::AppError;
use ferry_core::types::id::TaskId;
use ferry_entity::task::{ScheduledTask, TaskType};
use ferry_scheduler::{TaskCreateParams, TaskScheduler, TaskStore};

use crate::output::{self, OutputFormat};

/// Task management arguments
#[derive(Debug, Args)]
pub struct TaskArgs {
    #[command(subcommand)]
    command: TaskCommands,
}

#[derive(Debug, Subcommand)]
enum TaskCommands {
    /// Schedule a new task
    Add {
        /// Operation kind: upload, download, or delete
        #[arg(value_name = "TYPE")]
        task_type: String,
        /// Source path (local for upload, remote for download/delete)
        source: String,
        /// Destination path (required for upload/download)
        #[arg(short, long)]
        dest: Option<String>,
        /// First run time, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
        /// Repeat the task after each successful run
        #[arg(long)]
        recurring: bool,
        /// Minutes between recurring runs
        #[arg(long, value_name = "MINUTES")]
        interval: Option<u32>,
    },
    /// List all scheduled tasks
    List,
    /// Show one task in full
    Show {
        /// Task id
        id: String,
    },
    /// Remove a scheduled task
    Remove {
        /// Task id
        id: String,
    },
}

/// Row shape for the task listing table.
#[derive(Debug, Serialize, Tabled)]
struct TaskRow {
    id: String,
    #[tabled(rename = "type")]
    task_type: String,
    source: String,
    destination: String,
    scheduled_at: String,
    recurring: String,
    status: String,
    last_error: String,
}

impl From<&ScheduledTask> for TaskRow {
    fn from(task: &ScheduledTask) -> Self {
        Self {
            id: task.id.to_string(),
            task_type: task.task_type.to_string(),
            source: task.source.clone(),
            destination: task.destination.clone().unwrap_or_default(),
            scheduled_at: task.scheduled_at.to_rfc3339(),
            recurring: match task.interval_minutes {
                Some(minutes) if task.recurring => format!("every {minutes}m"),
                _ => "no".to_string(),
            },
            status: task.status.to_string(),
            last_error: task.last_error.clone().unwrap_or_default(),
        }
    }
}

/// Execute a task subcommand
pub async fn execute(args: &TaskArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let connector = super::build_connector(&config)?;
    let store = TaskStore::load(&config.scheduler.tasks_file).await;
    let scheduler = TaskScheduler::new(store, connector, config.scheduler.clone());

    match &args.command {
        TaskCommands::Add {
            task_type,
            source,
            dest,
            at,
            recurring,
            interval,
        } => {
            let task_type: TaskType = task_type
                .parse()
                .map_err(|e: String| AppError::validation(e))?;
            let scheduled_at = at
                .as_deref()
                .map(parse_timestamp)
                .transpose()?;

            let task = scheduler
                .add(TaskCreateParams {
                    task_type,
                    source: source.clone(),
                    destination: dest.clone(),
                    scheduled_at,
                    recurring: *recurring,
                    interval_minutes: *interval,
                })
                .await?;
            output::print_success(&format!(
                "Scheduled {} task {} for {}",
                task.task_type, task.id, task.scheduled_at
            ));
        }
        TaskCommands::List => {
            let tasks = scheduler.list().await;
            let rows: Vec<TaskRow> = tasks.iter().map(TaskRow::from).collect();
            output::print_list(&rows, format);
        }
        TaskCommands::Show { id } => {
            let task = scheduler.get(parse_id(id)?).await?;
            output::print_item(&task, format);
        }
        TaskCommands::Remove { id } => {
            scheduler.remove(parse_id(id)?).await?;
            output::print_success(&format!("Removed task {id}"));
        }
    }
    Ok(())
}

fn parse_id(raw: &str) -> Result<TaskId, AppError> {
    raw.parse()
        .map_err(|_| AppError::validation(format!("'{raw}' is not a valid task id")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::validation(format!("Invalid timestamp '{raw}': {e}")))
}
