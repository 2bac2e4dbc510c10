//! Supabase PostgREST document store.
//!
//! Rows live in a single table (`todos` by default):
//! `id`, `title`, `completed`, `created_at default now()`.
//!
//! PostgREST has no push channel over plain HTTP, so each feed is a polling
//! task. Local writes wake every feed right away; remote writes show up on
//! the next poll.

use crate::{
    sort_newest_first, BackendError, BackendResult, DocumentStore, FeedEvent, Item, ItemId,
};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, error, warn};

/// How many compare-and-set rounds a toggle gets before giving up.
pub const MAX_TOGGLE_ATTEMPTS: u32 = 3;

const SELECT_COLUMNS: &str = "id,title,completed,created_at";

#[derive(Debug, Serialize)]
struct NewItem<'a> {
    title: &'a str,
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct IdRow {
    id: ItemId,
}

#[derive(Debug, Deserialize)]
struct CompletedRow {
    completed: bool,
}

struct Inner {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
    table: String,
    poll_interval: Duration,
    access_token: RwLock<Option<String>>,
    /// One wake-up handle per open feed.
    feeds: Mutex<Vec<Weak<Notify>>>,
}

/// Document store backed by a Supabase table.
#[derive(Clone)]
pub struct SupabaseDocumentStore {
    inner: Arc<Inner>,
}

impl SupabaseDocumentStore {
    /// Create a new store.
    ///
    /// # Arguments
    /// * `api_url` - The Supabase project API URL (e.g., `https://xyz.supabase.co`)
    /// * `anon_key` - The Supabase publishable API key
    /// * `table` - Table holding the items
    /// * `poll_interval` - How often feeds re-read the table
    pub fn new(
        api_url: impl Into<String>,
        anon_key: impl Into<String>,
        table: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        let api_url: String = api_url.into();
        Self {
            inner: Arc::new(Inner {
                http_client: reqwest::Client::new(),
                api_url: api_url.trim_end_matches('/').to_string(),
                anon_key: anon_key.into(),
                table: table.into(),
                poll_interval,
                access_token: RwLock::new(None),
                feeds: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of feeds still being polled.
    pub fn open_feeds(&self) -> usize {
        let mut feeds = self.inner.feeds.lock();
        feeds.retain(|feed| feed.strong_count() > 0);
        feeds.len()
    }
}

impl Inner {
    fn rest_url(&self) -> String {
        format!("{}/rest/v1/{}", self.api_url, self.table)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self
            .access_token
            .read()
            .clone()
            .unwrap_or_else(|| self.anon_key.clone());
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    /// Wake every open feed so it re-reads the table.
    fn notify_feeds(&self) {
        let mut feeds = self.feeds.lock();
        feeds.retain(|feed| match feed.upgrade() {
            Some(notify) => {
                notify.notify_one();
                true
            }
            None => false,
        });
    }

    async fn check_response(response: Response) -> BackendResult<Response> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            error!("Supabase request failed: {} - {}", status, body);
            return Err(BackendError::Supabase {
                status,
                message: body,
            });
        }
        Ok(response)
    }

    /// PATCH rows matching `filters` and return how many were touched.
    async fn patch<T: Serialize>(
        &self,
        filters: &[(&str, String)],
        body: &T,
    ) -> BackendResult<usize> {
        let request = self
            .http_client
            .patch(self.rest_url())
            .query(filters)
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(body);

        let response = Self::check_response(self.authorized(request).send().await?).await?;
        let rows: Vec<IdRow> = response.json().await?;
        Ok(rows.len())
    }

    async fn patch_one<T: Serialize>(&self, id: &ItemId, body: &T) -> BackendResult<()> {
        let touched = self.patch(&[("id", format!("eq.{}", id))], body).await?;
        if touched == 0 {
            return Err(BackendError::NotFound(id.clone()));
        }
        self.notify_feeds();
        Ok(())
    }

    async fn fetch_all(&self) -> BackendResult<Vec<Item>> {
        let request = self.http_client.get(self.rest_url()).query(&[
            ("select", SELECT_COLUMNS),
            ("order", "created_at.desc,id.desc"),
        ]);

        let response = Self::check_response(self.authorized(request).send().await?).await?;
        let mut items: Vec<Item> = response.json().await?;
        sort_newest_first(&mut items);
        Ok(items)
    }

    async fn fetch_completed(&self, id: &ItemId) -> BackendResult<bool> {
        let request = self
            .http_client
            .get(self.rest_url())
            .query(&[("select", "completed".to_string()), ("id", format!("eq.{}", id))]);

        let response = Self::check_response(self.authorized(request).send().await?).await?;
        let rows: Vec<CompletedRow> = response.json().await?;
        rows.first()
            .map(|row| row.completed)
            .ok_or_else(|| BackendError::NotFound(id.clone()))
    }
}

async fn poll_feed(inner: Arc<Inner>, wake: Arc<Notify>, tx: watch::Sender<FeedEvent>) {
    let mut last: Option<Arc<Vec<Item>>> = None;

    loop {
        match inner.fetch_all().await {
            Ok(items) => {
                if last.as_deref() != Some(&items) {
                    let items = Arc::new(items);
                    last = Some(items.clone());
                    if tx.send(FeedEvent::Snapshot(items)).is_err() {
                        break;
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, table = %inner.table, "live feed fetch failed, stopping feed");
                let _ = tx.send(FeedEvent::Failed(e.to_string()));
                break;
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(inner.poll_interval) => {}
            _ = wake.notified() => {}
            _ = tx.closed() => break,
        }
    }

    debug!(table = %inner.table, "live feed stopped");
}

#[async_trait]
impl DocumentStore for SupabaseDocumentStore {
    async fn insert(&self, title: &str) -> BackendResult<ItemId> {
        let inner = &self.inner;
        let request = inner
            .http_client
            .post(inner.rest_url())
            .query(&[("select", "id")])
            .header("Prefer", "return=representation")
            .json(&NewItem {
                title,
                completed: false,
            });

        let response = Inner::check_response(inner.authorized(request).send().await?).await?;
        let rows: Vec<IdRow> = response.json().await?;
        let id = rows
            .into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| BackendError::Supabase {
                status: 200,
                message: "insert returned no row".to_string(),
            })?;

        debug!(item_id = %id, "Todo inserted in Supabase");
        inner.notify_feeds();
        Ok(id)
    }

    async fn delete(&self, id: &ItemId) -> BackendResult<()> {
        let inner = &self.inner;
        let request = inner
            .http_client
            .delete(inner.rest_url())
            .query(&[("id", format!("eq.{}", id))]);

        Inner::check_response(inner.authorized(request).send().await?).await?;
        debug!(item_id = %id, "Todo deleted from Supabase");
        inner.notify_feeds();
        Ok(())
    }

    async fn update_title(&self, id: &ItemId, title: &str) -> BackendResult<()> {
        self.inner
            .patch_one(id, &serde_json::json!({ "title": title }))
            .await
    }

    async fn set_completed(&self, id: &ItemId, completed: bool) -> BackendResult<()> {
        self.inner
            .patch_one(id, &serde_json::json!({ "completed": completed }))
            .await
    }

    /// Compare-and-set: the PATCH only matches while `completed` still holds
    /// the value just read. A miss means another writer got there first.
    async fn toggle_completed(&self, id: &ItemId) -> BackendResult<bool> {
        let inner = &self.inner;

        for attempt in 1..=MAX_TOGGLE_ATTEMPTS {
            let seen = inner.fetch_completed(id).await?;
            let touched = inner
                .patch(
                    &[
                        ("id", format!("eq.{}", id)),
                        ("completed", format!("eq.{}", seen)),
                    ],
                    &serde_json::json!({ "completed": !seen }),
                )
                .await?;

            if touched > 0 {
                inner.notify_feeds();
                return Ok(!seen);
            }
            debug!(item_id = %id, attempt, "toggle lost a race, retrying");
        }

        warn!(item_id = %id, "toggle gave up after {} attempts", MAX_TOGGLE_ATTEMPTS);
        Err(BackendError::Conflict(id.clone()))
    }

    async fn list(&self) -> BackendResult<Vec<Item>> {
        self.inner.fetch_all().await
    }

    fn feed(&self) -> watch::Receiver<FeedEvent> {
        let (tx, rx) = watch::channel(FeedEvent::Pending);
        let wake = Arc::new(Notify::new());
        self.inner.feeds.lock().push(Arc::downgrade(&wake));

        tokio::spawn(poll_feed(self.inner.clone(), wake, tx));
        rx
    }

    fn set_access_token(&self, token: Option<String>) {
        *self.inner.access_token.write() = token;
    }
}

impl std::fmt::Debug for SupabaseDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseDocumentStore")
            .field("api_url", &self.inner.api_url)
            .field("table", &self.inner.table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> SupabaseDocumentStore {
        SupabaseDocumentStore::new(server.uri(), "anon", "todos", Duration::from_secs(60))
    }

    fn row(id: &str, title: &str, completed: bool, created_at: &str) -> serde_json::Value {
        json!({ "id": id, "title": title, "completed": completed, "created_at": created_at })
    }

    #[tokio::test]
    async fn insert_posts_uncompleted_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/rest/v1/todos"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(json!({ "title": "Buy milk", "completed": false })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([{ "id": "t1" }])))
            .expect(1)
            .mount(&server)
            .await;

        let id = store(&server).insert("Buy milk").await.unwrap();
        assert_eq!(id, ItemId::from("t1"));
    }

    #[tokio::test]
    async fn requests_use_access_token_when_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(header("Authorization", "Bearer user-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(header("Authorization", "Bearer anon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let store = store(&server);
        store.set_access_token(Some("user-token".into()));
        store.list().await.unwrap();
        store.set_access_token(None);
        store.list().await.unwrap();
    }

    #[tokio::test]
    async fn list_orders_newest_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(query_param("order", "created_at.desc,id.desc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                row("a", "older", false, "2024-05-01T10:00:00Z"),
                row("b", "newer", true, "2024-05-02T10:00:00Z"),
            ])))
            .mount(&server)
            .await;

        let items = store(&server).list().await.unwrap();
        let titles: Vec<_> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["newer", "older"]);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/todos"))
            .and(query_param("id", "eq.gone"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = store(&server)
            .update_title(&ItemId::from("gone"), "Hello world")
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_of_missing_row_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/todos"))
            .and(query_param("id", "eq.gone"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        store(&server).delete(&ItemId::from("gone")).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_write_surfaces_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(401).set_body_string("JWT expired"))
            .mount(&server)
            .await;

        match store(&server).delete(&ItemId::from("t1")).await {
            Err(BackendError::Supabase { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "JWT expired");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn toggle_compares_against_seen_value() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .and(query_param("id", "eq.t1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "completed": false }])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/todos"))
            .and(query_param("id", "eq.t1"))
            .and(query_param("completed", "eq.false"))
            .and(body_json(json!({ "completed": true })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "t1" }])))
            .expect(1)
            .mount(&server)
            .await;

        let now = store(&server).toggle_completed(&ItemId::from("t1")).await.unwrap();
        assert!(now);
    }

    #[tokio::test]
    async fn toggle_gives_up_when_always_outraced() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "completed": true }])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(u64::from(MAX_TOGGLE_ATTEMPTS))
            .mount(&server)
            .await;

        let err = store(&server)
            .toggle_completed(&ItemId::from("t1"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Conflict(_)));
    }

    #[tokio::test]
    async fn toggle_of_missing_row_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let err = store(&server)
            .toggle_completed(&ItemId::from("gone"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::NotFound(_)));
    }

    #[tokio::test]
    async fn feed_publishes_snapshot_then_stops_on_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([row(
                "a",
                "first",
                false,
                "2024-05-01T10:00:00Z"
            )])))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let store = SupabaseDocumentStore::new(
            server.uri(),
            "anon",
            "todos",
            Duration::from_millis(50),
        );
        let mut feed = store.feed();

        feed.changed().await.unwrap();
        match &*feed.borrow_and_update() {
            FeedEvent::Snapshot(items) => assert_eq!(items.len(), 1),
            other => panic!("unexpected: {other:?}"),
        }

        feed.changed().await.unwrap();
        assert!(matches!(&*feed.borrow_and_update(), FeedEvent::Failed(_)));

        // the poll task is gone
        assert!(feed.changed().await.is_err());
    }

    #[tokio::test]
    async fn dropped_feed_is_forgotten() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/todos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let store = store(&server);
        let mut feed = store.feed();
        feed.changed().await.unwrap();
        assert_eq!(store.open_feeds(), 1);

        drop(feed);
        tokio::time::timeout(Duration::from_secs(2), async {
            while store.open_feeds() > 0 {
                store.inner.notify_feeds();
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("poll task did not stop");
    }
}
