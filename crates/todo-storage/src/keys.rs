//! Storage key constants.

/// Keys used in the local store.
pub struct StorageKeys;

impl StorageKeys {
    /// Cached identity of the signed-in user (JSON)
    pub const USER: &'static str = "user";
}
