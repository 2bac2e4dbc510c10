//! Persistence of the last-known identity.

use crate::{Identity, KeyValueStore, StorageKeys, StorageResult};
use std::sync::Arc;

/// Caches the signed-in identity under the `user` key so a restart can
/// resume the session without signing in again.
#[derive(Clone)]
pub struct SessionCache {
    storage: Arc<dyn KeyValueStore>,
}

impl SessionCache {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self { storage }
    }

    /// Persist `identity`, or remove the cached entry when `None`.
    pub fn store(&self, identity: Option<&Identity>) -> StorageResult<()> {
        match identity {
            Some(identity) => {
                let json = serde_json::to_string(identity)?;
                self.storage.set(StorageKeys::USER, &json)?;
                tracing::debug!(user_id = %identity.user_id, "cached identity");
            }
            None => {
                self.storage.delete(StorageKeys::USER)?;
                tracing::debug!("cleared cached identity");
            }
        }
        Ok(())
    }

    /// Read the cached identity, `None` if nothing is stored.
    pub fn load(&self) -> StorageResult<Option<Identity>> {
        match self.storage.get(StorageKeys::USER)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Like [`load`](Self::load), but a failed read counts as "not logged in".
    pub fn load_or_none(&self) -> Option<Identity> {
        match self.load() {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cached identity");
                None
            }
        }
    }
}
