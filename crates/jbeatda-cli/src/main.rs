//! jbeatda - command-line client for the jbeatda backend.
//!
//! Usage:
//!   jbeatda login [--email <email>] [--remember]
//!   jbeatda logout | whoami | session | watch-session
//!   jbeatda stamps [--refresh]
//!   jbeatda stamp <menu_id> | delete-stamp <stamp_id>
//!   jbeatda settings

mod commands;

use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;
use jbeatda_core::{AppContext, Config};

/// Base name of the daily-rotated log file
const LOG_FILE: &str = "jbeatda.log";

#[derive(Parser)]
#[command(name = "jbeatda")]
#[command(about = "jbeatda client - stamps and account, available offline from cache")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber: stderr plus a daily log file.
/// Use RUST_LOG to control the level (e.g. RUST_LOG=jbeatda_core=debug).
fn init_tracing(log_dir: &Path) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let (file_writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let config = Config::load()?;

    // Flushes buffered log lines when dropped at exit
    let _log_guard = init_tracing(&config.log_dir()?)?;
    info!(version = env!("CARGO_PKG_VERSION"), "jbeatda starting");

    let ctx = AppContext::build(config)?;
    cli.command.run(&ctx).await
}
