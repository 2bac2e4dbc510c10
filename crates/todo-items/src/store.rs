//! Item store client used by the screens.

use crate::{DocumentStore, FeedEvent, Item, ItemError, ItemId, ItemResult, WriteOp};
use std::sync::Arc;
use todo_config_and_utils::validate_title;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Registration returned by [`ItemStore::subscribe_all`].
///
/// Callbacks stop when this is dropped or unsubscribed.
pub struct ItemSubscription {
    task: JoinHandle<()>,
}

impl ItemSubscription {
    pub fn unsubscribe(self) {}

    /// True once the subscription has ended on its own (after an error).
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for ItemSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// CRUD and live queries over the shared todo collection.
///
/// Titles are trimmed and checked here, once, before any request is made.
#[derive(Clone)]
pub struct ItemStore {
    backend: Arc<dyn DocumentStore>,
}

impl ItemStore {
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn DocumentStore> {
        &self.backend
    }

    /// Create an uncompleted item and return its id.
    pub async fn add(&self, title: &str) -> ItemResult<ItemId> {
        let title = validate_title(title)?;
        let id = self
            .backend
            .insert(&title)
            .await
            .map_err(ItemError::write(WriteOp::Add))?;
        info!(item_id = %id, "Todo added");
        Ok(id)
    }

    /// Delete an item. A missing id is not an error.
    pub async fn remove(&self, id: &ItemId) -> ItemResult<()> {
        self.backend
            .delete(id)
            .await
            .map_err(ItemError::write(WriteOp::Delete))?;
        info!(item_id = %id, "Todo deleted");
        Ok(())
    }

    /// Replace the title; `completed` and `created_at` are untouched.
    pub async fn set_title(&self, id: &ItemId, title: &str) -> ItemResult<()> {
        let title = validate_title(title)?;
        self.backend
            .update_title(id, &title)
            .await
            .map_err(ItemError::write(WriteOp::Update))?;
        info!(item_id = %id, "Todo updated");
        Ok(())
    }

    /// Write `!current_completed` and return it.
    ///
    /// The caller's view of the flag is trusted as-is. Two calls made with the
    /// same stale value both write the same result; use [`toggle`](Self::toggle)
    /// to flip against the stored value instead.
    pub async fn toggle_complete(&self, id: &ItemId, current_completed: bool) -> ItemResult<bool> {
        let completed = !current_completed;
        self.backend
            .set_completed(id, completed)
            .await
            .map_err(ItemError::write(WriteOp::Toggle))?;
        info!(item_id = %id, completed, "Todo status updated");
        Ok(completed)
    }

    /// Flip `completed` atomically in the backend and return the new value.
    pub async fn toggle(&self, id: &ItemId) -> ItemResult<bool> {
        let completed = self
            .backend
            .toggle_completed(id)
            .await
            .map_err(ItemError::write(WriteOp::Toggle))?;
        info!(item_id = %id, completed, "Todo toggled");
        Ok(completed)
    }

    /// One-shot read of the whole collection, newest first.
    pub async fn list(&self) -> ItemResult<Vec<Item>> {
        self.backend.list().await.map_err(ItemError::Read)
    }

    /// Deliver the full ordered collection now and after every change.
    ///
    /// Changes that land back to back may be coalesced into one call; the
    /// list passed is always the latest, so no change is lost from view.
    /// A feed error goes to `on_error` once and ends the subscription; there
    /// is no retry. Must be called within a Tokio runtime.
    pub fn subscribe_all<F, E>(&self, on_items: F, on_error: E) -> ItemSubscription
    where
        F: Fn(Vec<Item>) + Send + Sync + 'static,
        E: Fn(ItemError) + Send + Sync + 'static,
    {
        let mut feed = self.backend.feed();

        let task = tokio::spawn(async move {
            loop {
                let event = feed.borrow_and_update().clone();
                match event {
                    FeedEvent::Pending => {}
                    FeedEvent::Snapshot(items) => {
                        debug!(count = items.len(), "todo snapshot");
                        on_items(items.as_ref().clone());
                    }
                    FeedEvent::Failed(message) => {
                        warn!(error = %message, "todo subscription failed");
                        on_error(ItemError::Subscription(message));
                        return;
                    }
                }

                if feed.changed().await.is_err() {
                    on_error(ItemError::Subscription("feed closed".to_string()));
                    return;
                }
            }
        });

        ItemSubscription { task }
    }
}
