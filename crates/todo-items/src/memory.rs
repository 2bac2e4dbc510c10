//! In-process document store.

use crate::{
    sort_newest_first, BackendError, BackendResult, DocumentStore, FeedEvent, Item, ItemId,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

#[derive(Default)]
struct Table {
    rows: HashMap<ItemId, Item>,
    last_created_at: Option<DateTime<Utc>>,
}

impl Table {
    /// Server clock that never repeats or goes backwards.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_created_at {
            Some(last) if now <= last => last + ChronoDuration::microseconds(1),
            _ => now,
        };
        self.last_created_at = Some(ts);
        ts
    }

    fn snapshot(&self) -> Arc<Vec<Item>> {
        let mut items: Vec<Item> = self.rows.values().cloned().collect();
        sort_newest_first(&mut items);
        Arc::new(items)
    }
}

/// Document store held in memory.
///
/// Every change publishes a full snapshot to all feeds. Tests can make
/// writes fail, slow them down, or break the feed.
pub struct MemoryDocumentStore {
    table: Mutex<Table>,
    feed: watch::Sender<FeedEvent>,
    fail_writes: AtomicBool,
    write_delay: Mutex<Option<Duration>>,
    writes: AtomicUsize,
    access_token: Mutex<Option<String>>,
}

impl Default for MemoryDocumentStore {
    fn default() -> Self {
        let (feed, _) = watch::channel(FeedEvent::Snapshot(Arc::new(Vec::new())));
        Self {
            table: Mutex::new(Table::default()),
            feed,
            fail_writes: AtomicBool::new(false),
            write_delay: Mutex::new(None),
            writes: AtomicUsize::new(0),
            access_token: Mutex::new(None),
        }
    }
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Hold every write this long before applying it.
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    /// Break every open feed.
    pub fn fail_feed(&self, message: impl Into<String>) {
        self.feed.send_replace(FeedEvent::Failed(message.into()));
    }

    /// Number of write requests that reached the store, failed ones included.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Bearer token the last request would have carried.
    pub fn access_token(&self) -> Option<String> {
        self.access_token.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.table.lock().rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, id: &ItemId) -> Option<Item> {
        self.table.lock().rows.get(id).cloned()
    }

    async fn begin_write(&self) -> BackendResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(BackendError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }

    fn publish(&self, table: &Table) {
        self.feed.send_replace(FeedEvent::Snapshot(table.snapshot()));
    }

    fn update_row(&self, id: &ItemId, apply: impl FnOnce(&mut Item)) -> BackendResult<()> {
        let mut table = self.table.lock();
        let row = table
            .rows
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(id.clone()))?;
        apply(row);
        self.publish(&table);
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn insert(&self, title: &str) -> BackendResult<ItemId> {
        self.begin_write().await?;

        let mut table = self.table.lock();
        let id = ItemId::new(Uuid::new_v4().to_string());
        let created_at = table.next_timestamp();
        table.rows.insert(
            id.clone(),
            Item {
                id: id.clone(),
                title: title.to_string(),
                completed: false,
                created_at,
            },
        );
        self.publish(&table);
        tracing::debug!(item_id = %id, "inserted todo");
        Ok(id)
    }

    async fn delete(&self, id: &ItemId) -> BackendResult<()> {
        self.begin_write().await?;

        let mut table = self.table.lock();
        if table.rows.remove(id).is_some() {
            self.publish(&table);
        }
        Ok(())
    }

    async fn update_title(&self, id: &ItemId, title: &str) -> BackendResult<()> {
        self.begin_write().await?;
        self.update_row(id, |item| item.title = title.to_string())
    }

    async fn set_completed(&self, id: &ItemId, completed: bool) -> BackendResult<()> {
        self.begin_write().await?;
        self.update_row(id, |item| item.completed = completed)
    }

    async fn toggle_completed(&self, id: &ItemId) -> BackendResult<bool> {
        self.begin_write().await?;
        let mut completed = false;
        self.update_row(id, |item| {
            item.completed = !item.completed;
            completed = item.completed;
        })?;
        Ok(completed)
    }

    async fn list(&self) -> BackendResult<Vec<Item>> {
        Ok(self.table.lock().snapshot().as_ref().clone())
    }

    fn feed(&self) -> watch::Receiver<FeedEvent> {
        self.feed.subscribe()
    }

    fn set_access_token(&self, token: Option<String>) {
        *self.access_token.lock() = token;
    }
}
