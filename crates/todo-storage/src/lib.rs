//! Local persistence for todo-sync.
//!
//! A small synchronous key-value abstraction with two backends:
//! - [`FileStore`]: a JSON object file, rewritten atomically on every change
//! - [`MemoryStore`]: an in-process map for tests and the memory backend
//!
//! [`SessionCache`] sits on top and persists the last-known [`Identity`].

mod file;
mod identity;
mod keys;
mod memory;
mod session;
mod traits;

pub use file::FileStore;
pub use identity::{Credentials, Identity};
pub use keys::StorageKeys;
pub use memory::MemoryStore;
pub use session::SessionCache;
pub use traits::KeyValueStore;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Encoding(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
