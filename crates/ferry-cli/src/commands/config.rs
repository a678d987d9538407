//! Configuration inspection commands.

use clap::{Args, Subcommand};

use ferry_core::config::AppConfig;
use ferry_core::error::AppError;

use crate::output::{self, OutputFormat};

/// Configuration arguments
#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Debug, Subcommand)]
enum ConfigCommands {
    /// Show the effective configuration
    Show,
}

/// Execute a config subcommand
pub async fn execute(args: &ConfigArgs, env: &str, format: OutputFormat) -> Result<(), AppError> {
    let config = super::load_config(env)?;

    match args.command {
        ConfigCommands::Show => match format {
            OutputFormat::Json => output::print_item(&masked(&config), OutputFormat::Json),
            OutputFormat::Table => {
                let config = masked(&config);
                println!("connection");
                output::print_kv("protocol", &config.connection.protocol);
                output::print_kv("host", &config.connection.host);
                output::print_kv("port", &config.connection.port.to_string());
                output::print_kv("username", &config.connection.username);
                output::print_kv("local_root", &config.connection.local_root);
                println!("scheduler");
                output::print_kv("enabled", &config.scheduler.enabled.to_string());
                output::print_kv(
                    "poll_interval_seconds",
                    &config.scheduler.poll_interval_seconds.to_string(),
                );
                output::print_kv("tasks_file", &config.scheduler.tasks_file);
                println!("paths");
                output::print_kv("remote_upload_dir", &config.paths.remote_upload_dir);
                output::print_kv("local_download_dir", &config.paths.local_download_dir);
                output::print_kv("temp_dir", &config.paths.temp_dir);
                println!("logging");
                output::print_kv("level", &config.logging.level);
                output::print_kv("format", &config.logging.format);
            }
        },
    }
    Ok(())
}

/// Never echo credentials back to the terminal.
fn masked(config: &AppConfig) -> AppConfig {
    let mut config = config.clone();
    if !config.connection.password.is_empty() {
        config.connection.password = "********".to_string();
    }
    config
}
