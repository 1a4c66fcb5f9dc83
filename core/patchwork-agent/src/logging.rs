//! File-backed tracing setup for the agent.
//!
//! The agent runs headless under launchd, so everything goes to a log file
//! under the user's Library/Logs rather than stderr. If the log directory
//! cannot be created we fall back to stderr so diagnostics are never lost.

use std::env;
use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_FILE_NAME: &str = "patchwork-agent.log";

/// Initializes the global subscriber. The returned guard must be held for
/// the lifetime of the process so buffered lines are flushed on exit.
pub fn init() -> Option<WorkerGuard> {
    let debug_enabled = env::var("PATCHWORK_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match log_dir() {
        Some(dir) if fs_err::create_dir_all(&dir).is_ok() => {
            let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

fn log_dir() -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    Some(home.join("Library/Logs/Patchwork"))
}
