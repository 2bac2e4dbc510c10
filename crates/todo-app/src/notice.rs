//! Transient user-facing messages.

use std::fmt;
use todo_items::{ItemError, WriteOp};

/// One message shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Notice::Success(message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Notice::Error(message.into())
    }

    pub fn message(&self) -> &str {
        match self {
            Notice::Success(message) | Notice::Error(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }

    /// The notice for a failed item operation.
    ///
    /// Validation failures keep their own wording; backend failures collapse
    /// to one message per operation.
    pub fn from_item_error(err: &ItemError) -> Self {
        match err {
            ItemError::Validation(e) => Notice::error(e.to_string()),
            ItemError::Write { operation, .. } => Notice::error(match operation {
                WriteOp::Add => "Failed to add todo",
                WriteOp::Update => "Failed to update todo",
                WriteOp::Toggle => "Failed to update todo status",
                WriteOp::Delete => "Failed to delete todo",
            }),
            ItemError::Read(_) | ItemError::Subscription(_) => {
                Notice::error("Error fetching todos")
            }
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Success(message) => write!(f, "{}", message),
            Notice::Error(message) => write!(f, "Error: {}", message),
        }
    }
}
