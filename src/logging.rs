//! Tracing configuration and log routing.
//!
//! Events are logged to stdout with a compact formatter and, when possible, appended to a
//! file as well. `DOCSUMMARY_LOG_FILE` selects the file target; without it a default file
//! under `logs/docsummary.log` is used. File output goes through a non-blocking writer so
//! pipeline stages never stall on disk.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and optional file logging.
///
/// `RUST_LOG` controls filtering and defaults to `info`. The non-blocking file writer is
/// parked in a global guard so buffered lines survive until process exit.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match file_writer() {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

/// Build the non-blocking file writer, returning `None` when the target cannot be opened.
fn file_writer() -> Option<NonBlocking> {
    let appender = if let Ok(path) = std::env::var("DOCSUMMARY_LOG_FILE") {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
        {
            Ok(file) => tracing_appender::non_blocking(file),
            Err(err) => {
                eprintln!("Failed to open log file {path}: {err}");
                return None;
            }
        }
    } else {
        if let Err(err) = std::fs::create_dir_all("logs") {
            eprintln!("Failed to create logs directory: {err}");
            return None;
        }
        tracing_appender::non_blocking(tracing_appender::rolling::never("logs", "docsummary.log"))
    };

    let (non_blocking, guard) = appender;
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
