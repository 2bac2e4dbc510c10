//! The signed-in screen: live todo list plus write handlers.

use crate::app::AppState;
use crate::notice::Notice;
use std::future::Future;
use std::sync::Arc;
use todo_auth::AuthClient;
use todo_config_and_utils::validate_title;
use todo_items::{Item, ItemError, ItemId, ItemResult, ItemSubscription};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// What the list area shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ListView {
    Loading,
    Ready(Vec<Item>),
}

impl ListView {
    pub fn items(&self) -> &[Item] {
        match self {
            ListView::Loading => &[],
            ListView::Ready(items) => items,
        }
    }
}

/// Something the screen should show.
#[derive(Debug, Clone, PartialEq)]
pub enum HomeEvent {
    View(ListView),
    Notice(Notice),
}

/// Home screen state, alive while the screen is mounted.
///
/// Writes run in the background and report failures on a channel owned by
/// the screen. Once the screen is dropped the channel is gone and late
/// outcomes are discarded; the writes themselves still finish.
pub struct HomeScreen {
    state: AppState,
    view: watch::Receiver<ListView>,
    notices_tx: mpsc::UnboundedSender<Notice>,
    notices: mpsc::UnboundedReceiver<Notice>,
    _subscription: ItemSubscription,
}

impl HomeScreen {
    /// Mount the screen and subscribe to the whole collection.
    pub fn mount(state: AppState) -> Self {
        let (view_tx, view) = watch::channel(ListView::Loading);
        let (notices_tx, notices) = mpsc::unbounded_channel();
        let view_tx = Arc::new(view_tx);

        let on_items = {
            let view_tx = view_tx.clone();
            move |items: Vec<Item>| {
                view_tx.send_replace(ListView::Ready(items));
            }
        };
        let on_error = {
            let notices_tx = notices_tx.clone();
            move |err: ItemError| {
                error!(error = %err, "Error fetching todos");
                // stop the spinner; the last list stays on screen
                view_tx.send_if_modified(|view| {
                    let loading = *view == ListView::Loading;
                    if loading {
                        *view = ListView::Ready(Vec::new());
                    }
                    loading
                });
                let _ = notices_tx.send(Notice::from_item_error(&err));
            }
        };

        let subscription = state.items.subscribe_all(on_items, on_error);

        Self {
            state,
            view,
            notices_tx,
            notices,
            _subscription: subscription,
        }
    }

    /// The latest list state.
    pub fn view(&self) -> ListView {
        self.view.borrow().clone()
    }

    /// Wait for whichever comes first: a list push or a notice.
    ///
    /// Cancel-safe, so it can sit in a `select!` loop.
    pub async fn next_event(&mut self) -> Option<HomeEvent> {
        tokio::select! {
            changed = self.view.changed() => {
                changed.ok()?;
                Some(HomeEvent::View(self.view.borrow_and_update().clone()))
            }
            notice = self.notices.recv() => notice.map(HomeEvent::Notice),
        }
    }

    /// Add a todo. Short titles are refused here, before any write starts.
    pub fn add(&self, title: &str) -> Result<JoinHandle<()>, Notice> {
        validate_title(title).map_err(|e| Notice::error(e.to_string()))?;
        let title = title.to_string();
        let state = self.state.clone();
        Ok(self.spawn_write(async move {
            state.authorize_items().await;
            state.items.add(&title).await.map(|_| ())
        }))
    }

    pub fn edit(&self, id: &ItemId, title: &str) -> Result<JoinHandle<()>, Notice> {
        validate_title(title).map_err(|e| Notice::error(e.to_string()))?;
        let (id, title) = (id.clone(), title.to_string());
        let state = self.state.clone();
        Ok(self.spawn_write(async move {
            state.authorize_items().await;
            state.items.set_title(&id, &title).await
        }))
    }

    /// Flip `completed` against the stored value.
    pub fn toggle(&self, id: &ItemId) -> JoinHandle<()> {
        let id = id.clone();
        let state = self.state.clone();
        self.spawn_write(async move {
            state.authorize_items().await;
            state.items.toggle(&id).await.map(|_| ())
        })
    }

    /// Delete a todo. Any confirmation happens before this is called.
    pub fn delete(&self, id: &ItemId) -> JoinHandle<()> {
        let id = id.clone();
        let state = self.state.clone();
        self.spawn_write(async move {
            state.authorize_items().await;
            state.items.remove(&id).await
        })
    }

    pub async fn log_out(&self) -> Notice {
        log_out(&self.state.auth).await
    }

    fn spawn_write<F>(&self, write: F) -> JoinHandle<()>
    where
        F: Future<Output = ItemResult<()>> + Send + 'static,
    {
        let notices_tx = self.notices_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = write.await {
                error!(error = %e, "Todo write failed");
                if notices_tx.send(Notice::from_item_error(&e)).is_err() {
                    debug!("Home screen unmounted, dropping write outcome");
                }
            }
        })
    }
}

/// Sign out and report the outcome.
pub async fn log_out(auth: &AuthClient) -> Notice {
    match auth.sign_out().await {
        Ok(()) => Notice::success("Logged out successfully"),
        Err(e) => {
            error!(error = %e, "Error logging out");
            Notice::error("Error logging out")
        }
    }
}
