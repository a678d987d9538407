//! CLI command definitions and dispatch.

pub mod config;
pub mod remote;
pub mod task;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;
use ferry_connector::LocalDirConnector;
use ferry_core::config::AppConfig;
use ferry_core::error::AppError;
use ferry_core::traits::connector::TransferConnector;

/// Ferry — scheduled remote file transfers
#[derive(Debug, Parser)]
#[command(name = "ferry", version, about, long_about = None)]
pub struct Cli {
    /// Configuration environment (selects config/<env>.toml overlay)
    #[arg(short, long, default_value = "development")]
    pub env: String,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scheduled task management
    Task(task::TaskArgs),
    /// Immediate remote file operations
    Remote(remote::RemoteArgs),
    /// Configuration management
    Config(config::ConfigArgs),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<(), AppError> {
        match &self.command {
            Commands::Task(args) => task::execute(args, &self.env, self.format).await,
            Commands::Remote(args) => remote::execute(args, &self.env, self.format).await,
            Commands::Config(args) => config::execute(args, &self.env, self.format).await,
        }
    }
}

/// Helper: load configuration for the given environment
pub fn load_config(env: &str) -> Result<AppConfig, AppError> {
    AppConfig::load(env).map_err(|e| AppError::configuration(format!("Failed to load config: {e}")))
}

/// Helper: build the transfer connector selected by the configuration
pub fn build_connector(config: &AppConfig) -> Result<Arc<dyn TransferConnector>, AppError> {
    match config.connection.protocol.as_str() {
        "local" => Ok(Arc::new(LocalDirConnector::new(
            &config.connection.local_root,
        ))),
        other => Err(AppError::configuration(format!(
            "Unsupported connector protocol '{other}' (available: local)"
        ))),
    }
}
