//! Root controller: session restore and routing.

use crate::app::AppState;
use std::time::Duration;
use todo_auth::AuthSubscription;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Which screen is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Loading,
    Auth,
    Home,
}

/// Owns the auth observer for the lifetime of the app.
///
/// Every identity change is persisted to the session cache, forwarded to the
/// item store as its bearer token, and turned into a [`Route`]. A background
/// task refreshes the session ahead of token expiry so open feeds keep a
/// valid token.
pub struct RootController {
    state: AppState,
    route: watch::Receiver<Route>,
    _auth_subscription: AuthSubscription,
    session_refresh: JoinHandle<()>,
}

impl RootController {
    /// Restore the cached session, then start observing auth changes.
    ///
    /// The observer is registered after the restore so that its first
    /// callback sees the restored identity instead of clearing the cache.
    pub async fn mount(state: AppState) -> Self {
        let (route_tx, route) = watch::channel(Route::Loading);

        let cached = state.session.load_or_none();
        match state.auth.restore(cached).await {
            Ok(Some(identity)) => info!(user = %identity.display_name(), "Session restored"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Cached session could not be restored"),
        }

        let session = state.session.clone();
        let documents = state.items.backend().clone();
        let subscription = state.auth.observe_auth_state(move |identity| {
            if let Err(e) = session.store(identity.as_ref()) {
                warn!(error = %e, "Failed to update session cache");
            }

            documents.set_access_token(
                identity
                    .as_ref()
                    .and_then(|i| i.access_token())
                    .map(str::to_string),
            );

            let next = if identity.is_some() {
                Route::Home
            } else {
                Route::Auth
            };
            route_tx.send_if_modified(|current| {
                let changed = *current != next;
                *current = next;
                changed
            });
        });

        let session_refresh = {
            let auth = state.auth.clone();
            let lead = chrono::Duration::milliseconds(
                i64::try_from(state.config.session_refresh_lead_ms).unwrap_or(i64::MAX),
            );
            tokio::spawn(async move { auth.keep_session_fresh(lead).await })
        };

        Self {
            state,
            route,
            _auth_subscription: subscription,
            session_refresh,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn route(&self) -> Route {
        *self.route.borrow()
    }

    /// A receiver that wakes on every route change.
    pub fn routes(&self) -> watch::Receiver<Route> {
        self.route.clone()
    }

    /// Wait until the auth observer has routed to `route`.
    ///
    /// The observer persists the session before it routes, so once this
    /// returns true the cache is up to date.
    pub async fn wait_for_route(&self, route: Route, timeout: Duration) -> bool {
        let mut routes = self.routes();
        let reached = matches!(
            tokio::time::timeout(timeout, routes.wait_for(|r| *r == route)).await,
            Ok(Ok(_))
        );
        reached
    }
}

impl Drop for RootController {
    fn drop(&mut self) {
        self.session_refresh.abort();
    }
}
