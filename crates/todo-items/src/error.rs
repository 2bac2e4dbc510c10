//! Error types for item operations.

use crate::ItemId;
use std::fmt;
use thiserror::Error;
use todo_config_and_utils::ValidationError;

/// Failure reported by a [`DocumentStore`](crate::DocumentStore).
#[derive(Debug, Error)]
pub enum BackendError {
    /// Network or transport-level HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Supabase API returned a non-success HTTP status.
    #[error("Supabase error: {status} - {message}")]
    Supabase { status: u16, message: String },

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Todo not found: {0}")]
    NotFound(ItemId),

    /// Compare-and-set lost to concurrent writers too many times.
    #[error("Todo {0} kept changing underneath the update")]
    Conflict(ItemId),

    /// Backend refused to serve the request.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// The write an [`ItemError::Write`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    Add,
    Update,
    Toggle,
    Delete,
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WriteOp::Add => "add",
            WriteOp::Update => "update",
            WriteOp::Toggle => "toggle",
            WriteOp::Delete => "delete",
        })
    }
}

/// Error type for [`ItemStore`](crate::ItemStore) operations.
#[derive(Debug, Error)]
pub enum ItemError {
    /// Input rejected before reaching the backend.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Failed to {operation} todo: {source}")]
    Write {
        operation: WriteOp,
        #[source]
        source: BackendError,
    },

    #[error("Failed to fetch todos: {0}")]
    Read(#[source] BackendError),

    #[error("Live subscription failed: {0}")]
    Subscription(String),
}

impl ItemError {
    pub(crate) fn write(operation: WriteOp) -> impl FnOnce(BackendError) -> ItemError {
        move |source| ItemError::Write { operation, source }
    }
}

pub type ItemResult<T> = Result<T, ItemError>;
