//! Core types, configuration, and utilities for todo-sync.

mod config;
mod error;
mod logging;
mod paths;
mod validation;

pub use config::{
    BackendKind, Config, DEFAULT_LIVE_POLL_INTERVAL_MS, DEFAULT_LOG_LEVEL,
    DEFAULT_SESSION_REFRESH_LEAD_MS, DEFAULT_SUPABASE_PUBLISHABLE_KEY, DEFAULT_SUPABASE_URL,
    DEFAULT_TODOS_TABLE,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
pub use validation::{
    validate_sign_up, validate_title, ValidationError, MIN_PASSWORD_LEN, MIN_TITLE_LEN,
};
