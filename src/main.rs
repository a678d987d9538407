//! Ferry Daemon — scheduled remote file transfers
//!
//! Main entry point that wires the crates together and runs the task
//! scheduler until interrupted.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use ferry_connector::LocalDirConnector;
use ferry_core::config::AppConfig;
use ferry_core::error::AppError;
use ferry_core::traits::connector::TransferConnector;
use ferry_scheduler::{TaskScheduler, TaskStore};

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Daemon error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from file and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("FERRY_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main daemon run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Ferry v{}", env!("CARGO_PKG_VERSION"));

    if !config.scheduler.enabled {
        return Err(AppError::configuration(
            "Scheduler is disabled in configuration; nothing to run",
        ));
    }

    // ── Step 1: Transfer connector ───────────────────────────────
    let connector = build_connector(&config)?;
    tracing::info!("Connecting via '{}' connector...", connector.connector_type());
    connector.connect().await?;

    // ── Step 2: Durable task store ───────────────────────────────
    let store = TaskStore::load(&config.scheduler.tasks_file).await;
    tracing::info!(
        "Loaded {} task(s) from {}",
        store.len(),
        config.scheduler.tasks_file
    );

    // ── Step 3: Scheduler ────────────────────────────────────────
    let scheduler = TaskScheduler::new(store, Arc::clone(&connector), config.scheduler.clone());
    scheduler.start().await;

    // ── Step 4: Run until interrupted ────────────────────────────
    tracing::info!("Ferry is running; press Ctrl+C to stop");
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }

    tracing::info!("Shutdown signal received, stopping scheduler...");
    scheduler.stop().await;
    connector.disconnect().await;
    tracing::info!("Ferry shut down cleanly");
    Ok(())
}

/// Build the transfer connector selected by the configuration
fn build_connector(config: &AppConfig) -> Result<Arc<dyn TransferConnector>, AppError> {
    match config.connection.protocol.as_str() {
        "local" => Ok(Arc::new(LocalDirConnector::new(
            &config.connection.local_root,
        ))),
        other => Err(AppError::configuration(format!(
            "Unsupported connector protocol '{other}' (available: local)"
        ))),
    }
}
