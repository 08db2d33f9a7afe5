// ABOUTME: Tracing subscriber setup with console output and a daily-rolling log file
// ABOUTME: The returned guard must be held for the life of the process to flush file logs

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_FILTER: &str = "info,serenity=warn,tracing::span=warn";

/// Log file name prefix inside the log directory
pub const LOG_FILE: &str = "dragme.log";

/// Build the filter from `RUST_LOG`, then `level`, then the default
pub fn env_filter(level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match level {
        Some(level) => EnvFilter::new(format!("{},serenity=warn", level)),
        None => EnvFilter::new(DEFAULT_FILTER),
    })
}

/// Install console and file logging. `json` switches the console layer to JSON lines.
pub fn init_logging(log_dir: &Path, level: Option<&str>, json: bool) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let (console_plain, console_json) = if json {
        (None, Some(tracing_subscriber::fmt::layer().json()))
    } else {
        (Some(tracing_subscriber::fmt::layer()), None)
    };

    tracing_subscriber::registry()
        .with(env_filter(level))
        .with(file_layer)
        .with(console_plain)
        .with(console_json)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

/// Print panics with a backtrace before the process goes down
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("\n╔══════════════════════════════════════════════════════════╗");
        eprintln!("║ PANIC! dragme crashed with the following error:          ║");
        eprintln!("╚══════════════════════════════════════════════════════════╝\n");
        eprintln!("{}", panic_info);
        eprintln!("\nBacktrace:");
        eprintln!("{:?}", std::backtrace::Backtrace::force_capture());
        tracing::error!(panic = %panic_info, "Process panicked");
    }));
}
