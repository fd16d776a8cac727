use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes the logging system with both console and file output.
///
/// Returns the worker guard for the non-blocking file writer; the caller
/// must keep it alive for the process lifetime or buffered log lines are
/// dropped on exit.
pub fn init_logging() -> WorkerGuard {
    // Ensure logs directory exists
    let _ = fs::create_dir_all("logs");

    // Non-blocking file appender with daily rotation
    let file_appender = tracing_appender::rolling::daily("logs", "etl.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    // JSON layer for the persistent log file
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    // Human-readable layer for the console
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive("home_etl=info".parse().unwrap()))
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
