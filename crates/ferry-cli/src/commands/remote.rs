//! Immediate remote file operations.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use ferry_core::error::AppError;
use ferry_core::traits::connector::RemoteEntry;

use crate::output::{self, OutputFormat};

/// Remote operation arguments
#[derive(Debug, Args)]
pub struct RemoteArgs {
    #[command(subcommand)]
    command: RemoteCommands,
}

#[derive(Debug, Subcommand)]
enum RemoteCommands {
    /// List a remote directory
    Ls {
        /// Remote directory
        #[arg(default_value = "/")]
        dir: String,
    },
    /// Upload a local file now
    Upload {
        /// Local file path
        local: String,
        /// Remote destination path
        remote: String,
    },
    /// Download a remote file now
    Download {
        /// Remote file path
        remote: String,
        /// Local destination path
        local: String,
    },
    /// Delete a remote file now
    Rm {
        /// Remote file path
        remote: String,
    },
}

/// Row shape for the remote listing table.
#[derive(Debug, Serialize, Tabled)]
struct EntryRow {
    name: String,
    #[tabled(rename = "type")]
    kind: String,
    size_bytes: u64,
    modified: String,
}

impl From<&RemoteEntry> for EntryRow {
    fn from(entry: &RemoteEntry) -> Self {
        Self {
            name: entry.name.clone(),
            kind: if entry.is_directory { "dir" } else { "file" }.to_string(),
            size_bytes: entry.size_bytes,
            modified: entry
                .modified
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        }
    }
}

/// Execute a remote subcommand
pub async fn execute(args: &RemoteArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;
    let connector = super::build_connector(&config)?;
    connector.connect().await?;

    let result = run(args, connector.as_ref(), format).await;
    connector.disconnect().await;
    result
}

async fn run(
    args: &RemoteArgs,
    connector: &dyn ferry_core::traits::connector::TransferConnector,
    format: OutputFormat,
) -> Result<(), AppError> {
    match &args.command {
        RemoteCommands::Ls { dir } => {
            let entries = connector.list(dir).await?;
            let rows: Vec<EntryRow> = entries.iter().map(EntryRow::from).collect();
            output::print_list(&rows, format);
        }
        RemoteCommands::Upload { local, remote } => {
            connector.upload(local, remote, None).await?;
            output::print_success(&format!("Uploaded {local} to {remote}"));
        }
        RemoteCommands::Download { remote, local } => {
            connector.download(remote, local, None).await?;
            output::print_success(&format!("Downloaded {remote} to {local}"));
        }
        RemoteCommands::Rm { remote } => {
            connector.delete(remote).await?;
            output::print_success(&format!("Deleted {remote}"));
        }
    }
    Ok(())
}
