//! Logging initialization for todo-sync.
//!
//! Thin wrapper over the observability crate. Every process writes structured
//! JSONL to `<base_dir>/logs/dev.jsonl`; warnings and errors also go to stderr.

use crate::Paths;

/// Initialize the logging system.
///
/// `level` is the default filter for the file layer; `RUST_LOG` takes
/// precedence when set.
///
/// ```ignore
/// init_logging("info", &Paths::new()?);
/// tracing::info!("ready");
/// ```
pub fn init_logging(level: &str, paths: &Paths) {
    observability::init_with_config(observability::LogConfig {
        service_name: "todo-sync".into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: true,
        ..Default::default()
    });
}
