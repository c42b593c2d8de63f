//! Studyboard CLI - command line client for the study tracker API

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use std::time::Duration;
use studyboard_http::ClientError;
use tracing::{Level, error, info};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "studyboard")]
#[command(about = "Command line client for the study tracker")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for credentials and logs
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML, YAML or JSON)
    #[arg(short = 'c', long, global = true, env = "STUDYBOARD_CONFIG")]
    config: Option<PathBuf>,

    /// Timeout for the whole command in seconds (0 = no timeout)
    #[arg(short = 't', long, global = true, default_value = "60")]
    timeout: u64,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CliConfig::load(cli.config.as_deref(), cli.data_dir)?;
    logging::init_logging(cli.log_level.into(), &config.data_dir, cli.no_file_log)?;

    info!("Starting Studyboard CLI");

    if cli.timeout == 0 {
        match cli.command.execute(config).await {
            Ok(()) => {
                info!("Command completed successfully");
            }
            Err(e) => fail(e),
        }
    } else {
        let timeout_duration = Duration::from_secs(cli.timeout);
        match tokio::time::timeout(timeout_duration, cli.command.execute(config)).await {
            Ok(Ok(())) => {
                info!("Command completed successfully");
            }
            Ok(Err(e)) => fail(e),
            Err(_) => {
                error!("Command timed out after {} seconds", cli.timeout);
                eprintln!("Timed out after {} seconds", cli.timeout);
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Report a failed command and exit.
///
/// Client errors print their user-facing message; session expiry has
/// already been reported by the unauthenticated handler and prints nothing.
fn fail(e: anyhow::Error) -> ! {
    error!("Command failed: {e:#}");
    match e.downcast_ref::<ClientError>() {
        Some(client_error) => {
            if let Some(message) = client_error.user_message() {
                eprintln!("Error: {message}");
            }
        }
        None => eprintln!("Error: {e:#}"),
    }
    std::process::exit(1);
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }
}
