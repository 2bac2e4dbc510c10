//! Configuration management.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use url::Url;

/// Default Supabase URL (can be overridden at compile time via SUPABASE_URL env var).
pub const DEFAULT_SUPABASE_URL: &str = match option_env!("SUPABASE_URL") {
    Some(url) => url,
    None => "https://random.supabase.co",
};

/// Default Supabase publishable key (can be overridden at compile time via SUPABASE_PUBLISHABLE_KEY env var).
pub const DEFAULT_SUPABASE_PUBLISHABLE_KEY: &str = match option_env!("SUPABASE_PUBLISHABLE_KEY") {
    Some(key) => key,
    None => "random-key",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// PostgREST table holding todo items.
pub const DEFAULT_TODOS_TABLE: &str = "todos";

/// How often a live subscription re-reads the remote collection.
pub const DEFAULT_LIVE_POLL_INTERVAL_MS: u64 = 2_000;

/// How long before token expiry the session is refreshed in the background.
pub const DEFAULT_SESSION_REFRESH_LEAD_MS: u64 = 60_000;

/// Which backend the clients talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Supabase auth + PostgREST.
    #[default]
    Supabase,
    /// In-process backend; nothing leaves the process.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Supabase => write!(f, "supabase"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "supabase" => Ok(BackendKind::Supabase),
            "memory" => Ok(BackendKind::Memory),
            other => Err(CoreError::Config(format!("unknown backend: {}", other))),
        }
    }
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend selection.
    #[serde(default)]
    pub backend: BackendKind,
    /// Supabase project URL.
    #[serde(default = "default_supabase_url")]
    pub supabase_url: String,
    /// Supabase publishable API key (public, safe to expose).
    #[serde(default = "default_supabase_publishable_key")]
    pub supabase_publishable_key: String,
    /// Table holding todo items.
    #[serde(default = "default_todos_table")]
    pub todos_table: String,
    /// Live subscription poll interval in milliseconds.
    #[serde(default = "default_live_poll_interval_ms")]
    pub live_poll_interval_ms: u64,
    /// Refresh the session this many milliseconds before the token expires.
    #[serde(default = "default_session_refresh_lead_ms")]
    pub session_refresh_lead_ms: u64,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_supabase_url() -> String {
    DEFAULT_SUPABASE_URL.to_string()
}

fn default_supabase_publishable_key() -> String {
    DEFAULT_SUPABASE_PUBLISHABLE_KEY.to_string()
}

fn default_todos_table() -> String {
    DEFAULT_TODOS_TABLE.to_string()
}

fn default_live_poll_interval_ms() -> u64 {
    DEFAULT_LIVE_POLL_INTERVAL_MS
}

fn default_session_refresh_lead_ms() -> u64 {
    DEFAULT_SESSION_REFRESH_LEAD_MS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            backend: BackendKind::default(),
            supabase_url: default_supabase_url(),
            supabase_publishable_key: default_supabase_publishable_key(),
            todos_table: default_todos_table(),
            live_poll_interval_ms: DEFAULT_LIVE_POLL_INTERVAL_MS,
            session_refresh_lead_ms: DEFAULT_SESSION_REFRESH_LEAD_MS,
        }
    }
}

impl Config {
    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `TODO_SYNC_LOG_LEVEL` and `TODO_SYNC_BACKEND` overrides read
    /// through `lookup`. Unparseable backend names are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(log_level) = lookup("TODO_SYNC_LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            self.log_level = log_level.trim().to_string();
        }

        if let Some(raw) = lookup("TODO_SYNC_BACKEND").filter(|v| !v.trim().is_empty()) {
            match raw.parse::<BackendKind>() {
                Ok(backend) => self.backend = backend,
                Err(e) => tracing::warn!(error = %e, "ignoring TODO_SYNC_BACKEND"),
            }
        }
    }

    /// Get the Supabase URL as a parsed URL.
    pub fn supabase_url(&self) -> CoreResult<Url> {
        Url::parse(&self.supabase_url).map_err(CoreError::from)
    }

    /// Supabase URL without a trailing slash, suitable for joining REST paths.
    pub fn supabase_base_url(&self) -> String {
        self.supabase_url.trim_end_matches('/').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.backend, BackendKind::Supabase);
        assert_eq!(config.supabase_url, DEFAULT_SUPABASE_URL);
        assert_eq!(
            config.supabase_publishable_key,
            DEFAULT_SUPABASE_PUBLISHABLE_KEY
        );
        assert_eq!(config.todos_table, "todos");
        assert_eq!(config.live_poll_interval_ms, DEFAULT_LIVE_POLL_INTERVAL_MS);
        assert_eq!(config.session_refresh_lead_ms, 60_000);
    }

    #[test]
    fn test_config_load_from_file_partial() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        std::fs::write(&config_path, r#"{ "log_level": "debug", "backend": "memory" }"#).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.backend, BackendKind::Memory);
        assert_eq!(config.todos_table, DEFAULT_TODOS_TABLE);
    }

    #[test]
    fn test_config_load_written_file() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();

        let config = Config {
            supabase_url: "https://abc.supabase.co".to_string(),
            live_poll_interval_ms: 500,
            ..Config::default()
        };
        std::fs::write(
            paths.config_file(),
            serde_json::to_string_pretty(&config).unwrap(),
        )
        .unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.supabase_url, "https://abc.supabase.co");
        assert_eq!(loaded.live_poll_interval_ms, 500);
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load_from_file(&paths.config_file());
        assert!(config.is_err());

        let config = Config::default();
        assert_eq!(config.supabase_url, DEFAULT_SUPABASE_URL);
    }

    #[test]
    fn test_config_load_malformed_file_fails() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "{ not json").unwrap();

        assert!(matches!(
            Config::load_from_file(&config_path),
            Err(CoreError::Json(_))
        ));
    }

    #[test]
    fn test_apply_overrides() {
        let env: HashMap<&str, &str> = [
            ("TODO_SYNC_LOG_LEVEL", "trace"),
            ("TODO_SYNC_BACKEND", "Memory"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(config.log_level, "trace");
        assert_eq!(config.backend, BackendKind::Memory);
    }

    #[test]
    fn test_apply_overrides_ignores_unknown_backend() {
        let mut config = Config::default();
        config.apply_overrides(|name| {
            (name == "TODO_SYNC_BACKEND").then(|| "firebase".to_string())
        });
        assert_eq!(config.backend, BackendKind::Supabase);
    }

    #[test]
    fn test_config_supabase_url_parse() {
        let config = Config::default();
        let url = config.supabase_url().unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_config_invalid_url() {
        let config = Config {
            supabase_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(config.supabase_url().is_err());
    }

    #[test]
    fn test_supabase_base_url_strips_trailing_slash() {
        let config = Config {
            supabase_url: "https://abc.supabase.co/".to_string(),
            ..Config::default()
        };
        assert_eq!(config.supabase_base_url(), "https://abc.supabase.co");
    }

    #[test]
    fn test_backend_kind_parse_and_display() {
        assert_eq!("supabase".parse::<BackendKind>().unwrap(), BackendKind::Supabase);
        assert_eq!(" MEMORY ".parse::<BackendKind>().unwrap(), BackendKind::Memory);
        assert!("sqlite".parse::<BackendKind>().is_err());
        assert_eq!(BackendKind::Memory.to_string(), "memory");
    }
}
