//! Shared application state.

use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use todo_auth::{AuthClient, IdentityProvider, MemoryIdentityProvider, SupabaseAuthProvider};
use todo_config_and_utils::{BackendKind, Config, Paths};
use todo_items::{DocumentStore, ItemStore, MemoryDocumentStore, SupabaseDocumentStore};
use todo_storage::{FileStore, KeyValueStore, MemoryStore, SessionCache};
use tracing::{debug, info, warn};

/// Clients shared by the root controller and every screen.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub paths: Arc<Paths>,
    pub auth: Arc<AuthClient>,
    pub items: ItemStore,
    pub session: SessionCache,
}

impl AppState {
    /// Wire up the clients for the configured backend.
    ///
    /// The memory backend keeps the session cache in memory as well, so
    /// nothing outlives the process.
    pub fn build(config: Config, paths: Paths) -> anyhow::Result<Self> {
        paths.ensure_dirs()?;

        let (provider, documents, storage): (
            Arc<dyn IdentityProvider>,
            Arc<dyn DocumentStore>,
            Arc<dyn KeyValueStore>,
        ) = match config.backend {
            BackendKind::Supabase => {
                config
                    .supabase_url()
                    .context("supabase_url is not a valid URL")?;
                let base_url = config.supabase_base_url();
                (
                    Arc::new(SupabaseAuthProvider::new(
                        &base_url,
                        &config.supabase_publishable_key,
                    )),
                    Arc::new(SupabaseDocumentStore::new(
                        base_url.clone(),
                        config.supabase_publishable_key.clone(),
                        config.todos_table.clone(),
                        Duration::from_millis(config.live_poll_interval_ms),
                    )),
                    Arc::new(FileStore::new(paths.session_file())),
                )
            }
            BackendKind::Memory => (
                Arc::new(MemoryIdentityProvider::new()),
                Arc::new(MemoryDocumentStore::new()),
                Arc::new(MemoryStore::new()),
            ),
        };

        info!(
            backend = %config.backend,
            supabase_url = %config.supabase_url,
            table = %config.todos_table,
            "Configuration loaded"
        );

        Ok(Self::from_parts(config, paths, provider, documents, storage))
    }

    pub fn from_parts(
        config: Config,
        paths: Paths,
        provider: Arc<dyn IdentityProvider>,
        documents: Arc<dyn DocumentStore>,
        storage: Arc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            paths: Arc::new(paths),
            auth: Arc::new(AuthClient::new(provider)),
            items: ItemStore::new(documents),
            session: SessionCache::new(storage),
        }
    }

    /// Hand the item store a bearer token that has not expired.
    ///
    /// Refreshes the session if needed. The token is only cleared once the
    /// session is gone; any other failure leaves the current one in place.
    pub async fn authorize_items(&self) {
        match self.auth.access_token().await {
            Ok(token) => self.items.backend().set_access_token(Some(token)),
            Err(e) if self.auth.current_identity().is_some() => {
                warn!(error = %e, "Could not refresh access token, keeping the current one");
            }
            Err(e) => {
                debug!(error = %e, "No session, item requests go out anonymous");
                self.items.backend().set_access_token(None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use todo_storage::Identity;

    #[test]
    fn test_build_memory_backend() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().join("base"));
        let config = Config {
            backend: BackendKind::Memory,
            ..Config::default()
        };

        let state = AppState::build(config, paths).unwrap();
        assert!(state.paths.logs_dir().is_dir());
        assert!(state.session.load().unwrap().is_none());
        // memory sessions never touch the disk
        assert!(!state.paths.session_file().exists());
    }

    #[test]
    fn test_build_rejects_bad_supabase_url() {
        let dir = tempdir().unwrap();
        let config = Config {
            supabase_url: "not a url".to_string(),
            ..Config::default()
        };

        assert!(AppState::build(config, Paths::with_base_dir(dir.path().to_path_buf())).is_err());
    }

    fn memory_state(
        provider: Arc<MemoryIdentityProvider>,
        documents: Arc<MemoryDocumentStore>,
    ) -> AppState {
        AppState::from_parts(
            Config::default(),
            Paths::with_base_dir("/tmp/todo-sync-state-test".into()),
            provider,
            documents,
            Arc::new(MemoryStore::new()),
        )
    }

    #[tokio::test]
    async fn test_concurrent_authorize_after_expiry_keeps_token() {
        let provider = Arc::new(
            MemoryIdentityProvider::new().with_token_ttl(chrono::Duration::seconds(-1)),
        );
        provider.set_refresh_delay(Some(Duration::from_millis(50)));
        let documents = Arc::new(MemoryDocumentStore::new());
        let state = memory_state(provider, documents.clone());
        state
            .auth
            .sign_up("a@b.com", "secret1", "secret1")
            .await
            .unwrap();

        tokio::join!(state.authorize_items(), state.authorize_items());

        let identity = state.auth.current_identity().expect("session kept");
        assert!(documents.access_token().is_some());
        assert_eq!(documents.access_token().as_deref(), identity.access_token());
    }

    #[tokio::test]
    async fn test_authorize_keeps_token_while_session_exists() {
        let documents = Arc::new(MemoryDocumentStore::new());
        let state = memory_state(Arc::new(MemoryIdentityProvider::new()), documents.clone());
        // a session without credentials has no token to hand out
        state
            .auth
            .restore(Some(Identity::new("u1", None)))
            .await
            .unwrap();
        documents.set_access_token(Some("at-1".to_string()));

        state.authorize_items().await;
        assert_eq!(documents.access_token().as_deref(), Some("at-1"));
    }

    #[tokio::test]
    async fn test_authorize_without_session_goes_anonymous() {
        let documents = Arc::new(MemoryDocumentStore::new());
        let state = memory_state(Arc::new(MemoryIdentityProvider::new()), documents.clone());
        documents.set_access_token(Some("stale".to_string()));

        state.authorize_items().await;
        assert_eq!(documents.access_token(), None);
    }
}
