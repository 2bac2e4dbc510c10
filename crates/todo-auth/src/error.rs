//! Authentication error types.

use thiserror::Error;
use todo_config_and_utils::ValidationError;

/// Authentication error type.
#[derive(Error, Debug)]
pub enum AuthError {
    /// Local input check failed; nothing was sent
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Wrong email or password
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Sign-up with an email that already has an account
    #[error("Email is already in use")]
    EmailInUse,

    /// Email rejected by the provider
    #[error("Invalid email address")]
    InvalidEmail,

    /// Password rejected by the provider's strength rules
    #[error("Password is too weak")]
    WeakPassword,

    /// Account created but the provider wants the email confirmed first
    #[error("Email confirmation required")]
    ConfirmationRequired,

    /// Any other provider rejection
    #[error("Provider error (HTTP {status}): {message}")]
    Provider {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Token refresh error
    #[error("Token refresh failed: {0}")]
    TokenRefresh(String),

    /// Refresh retries exhausted
    #[error("Token refresh failed after {0} attempts")]
    RefreshExhausted(u32),

    /// No identity
    #[error("Not logged in")]
    NotLoggedIn,

    /// Invalid state transition in the auth FSM
    #[error("Invalid auth state transition: {0}")]
    InvalidStateTransition(String),

    /// HTTP request error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Network unavailable (transient error, can retry)
    #[error("Network unavailable")]
    NetworkUnavailable,
}

impl AuthError {
    /// Returns true if this error is transient and the operation can be retried.
    ///
    /// Transient errors include:
    /// - Network unavailable
    /// - HTTP errors with 5xx status codes
    /// - Connection timeouts
    pub fn is_transient(&self) -> bool {
        match self {
            AuthError::NetworkUnavailable => true,
            AuthError::Http(e) => {
                if e.is_connect() || e.is_timeout() {
                    return true;
                }
                if let Some(status) = e.status() {
                    return status.is_server_error();
                }
                false
            }
            AuthError::Provider { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result type alias using AuthError.
pub type AuthResult<T> = Result<T, AuthError>;
