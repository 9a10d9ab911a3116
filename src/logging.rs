//! Logging setup shared by the service and trainer binaries.
//!
//! - `RUST_LOG`: filter directives (default `info`)
//! - `RELAPSE_LOG_MODE`: `stdout` (default) or `file`
//! - `RELAPSE_LOG_FILE`: target for `file` mode (default `relapse-watch.log`)

use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILE: &str = "relapse-watch.log";

/// Where formatted log lines go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    File(PathBuf),
}

impl LogTarget {
    /// Resolve the target from `RELAPSE_LOG_MODE` / `RELAPSE_LOG_FILE`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("RELAPSE_LOG_MODE").ok().as_deref(),
            std::env::var("RELAPSE_LOG_FILE").ok().as_deref(),
        )
    }

    fn from_values(mode: Option<&str>, file: Option<&str>) -> Self {
        match mode.map(str::trim) {
            Some("file") => Self::File(PathBuf::from(
                file.filter(|f| !f.trim().is_empty())
                    .unwrap_or(DEFAULT_LOG_FILE),
            )),
            // stdout keeps `docker logs` working
            _ => Self::Stdout,
        }
    }
}

/// Install the global subscriber.
///
/// The returned guard flushes buffered lines on drop and must be held for
/// the lifetime of the process.
///
/// # Errors
/// Returns error if the log file cannot be opened.
pub fn init() -> std::io::Result<WorkerGuard> {
    let (writer, guard) = match LogTarget::from_env() {
        LogTarget::File(path) => tracing_appender::non_blocking(open_log_file(&path)?),
        LogTarget::Stdout => tracing_appender::non_blocking(std::io::stdout()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(writer))
        .init();

    Ok(guard)
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        // Best-effort: the open below reports the real failure.
        let _ = std::fs::create_dir_all(parent);
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
}
