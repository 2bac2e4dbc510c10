use crate::{BackendResult, Item, ItemId};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;

/// State of a live feed.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// No snapshot fetched yet.
    Pending,
    /// The whole collection, newest first.
    Snapshot(Arc<Vec<Item>>),
    /// The feed broke and will not recover.
    Failed(String),
}

/// A live document collection.
///
/// Writes touch exactly one row. Titles arrive already validated.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create an uncompleted item stamped with the server's clock.
    async fn insert(&self, title: &str) -> BackendResult<ItemId>;

    /// Remove a row. Removing a missing row succeeds.
    async fn delete(&self, id: &ItemId) -> BackendResult<()>;

    async fn update_title(&self, id: &ItemId, title: &str) -> BackendResult<()>;

    async fn set_completed(&self, id: &ItemId, completed: bool) -> BackendResult<()>;

    /// Flip `completed` against the stored value and return the new value.
    async fn toggle_completed(&self, id: &ItemId) -> BackendResult<bool>;

    async fn list(&self) -> BackendResult<Vec<Item>>;

    /// Subscribe to full snapshots. Must be called within a Tokio runtime.
    fn feed(&self) -> watch::Receiver<FeedEvent>;

    /// Bearer token for subsequent requests; `None` falls back to anonymous.
    fn set_access_token(&self, _token: Option<String>) {}
}
