//! # Observability
//!
//! Centralized logging layer for todo-sync.
//!
//! Binaries call `observability::init_with_config()` once at startup and use
//! standard `tracing` macros everywhere else. Library crates never install a
//! subscriber themselves.
//!
//! Every event is written as one JSON object per line to
//! `~/.todo-sync/logs/dev.jsonl` (or a configured path), so the log can be
//! followed with `tail -f ... | jq`. An optional compact stderr layer gives
//! immediate feedback in the terminal.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "todo-sync".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file;
mod json_layer;

use std::path::PathBuf;

pub use file::{default_log_path, CentralLogWriter};
pub use json_layer::LogEntry;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every log line.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by `RUST_LOG` environment variable.
    pub default_level: String,

    /// Optional custom log file path.
    /// Defaults to `~/.todo-sync/logs/dev.jsonl`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr.
    pub also_stderr: bool,

    /// Level used for the stderr layer when `RUST_LOG` is unset.
    pub stderr_level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
            stderr_level: "warn".into(),
        }
    }
}

/// Initialize logging with custom configuration.
///
/// If the log file cannot be opened the file layer is skipped and only the
/// stderr layer is installed; logging never prevents startup.
pub fn init_with_config(config: LogConfig) {
    file::init_subscriber(&config);
}
