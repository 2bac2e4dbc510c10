//! User-level scenarios.

use super::harness::{expect_route, expect_view, Backends};
use crate::app::Route;
use crate::notice::Notice;
use crate::screens::{AuthScreen, HomeScreen, ListView};
use std::sync::Arc;
use std::time::Duration;
use todo_auth::{IdentityProvider, MemoryIdentityProvider};
use todo_config_and_utils::Config;
use todo_storage::MemoryStore;

#[tokio::test]
async fn sign_up_caches_identity_and_starts_subscription() {
    let backends = Backends::in_memory();
    let root = backends.launch().await;
    assert_eq!(root.route(), Route::Auth);

    let auth = AuthScreen::new(root.state().auth.clone());
    assert_eq!(
        auth.sign_up("a@b.com", "secret1", "secret1").await,
        Notice::success("Sign Up successful!")
    );
    expect_route(&root, Route::Home).await;

    let cached = root.state().session.load().unwrap().expect("identity cached");
    assert_eq!(cached.email.as_deref(), Some("a@b.com"));
    assert_eq!(Some(cached), root.state().auth.current_identity());

    let mut home = HomeScreen::mount(root.state().clone());
    let view = expect_view(&mut home, |v| *v != ListView::Loading).await;
    assert_eq!(view, ListView::Ready(Vec::new()));
}

#[tokio::test]
async fn add_accepts_long_titles_and_rejects_short_ones() {
    let backends = Backends::in_memory();
    let root = backends.launch().await;
    AuthScreen::new(root.state().auth.clone())
        .sign_up("a@b.com", "secret1", "secret1")
        .await;
    expect_route(&root, Route::Home).await;
    let mut home = HomeScreen::mount(root.state().clone());

    home.add("Buy milk").unwrap().await.unwrap();
    let view = expect_view(&mut home, |v| v.items().len() == 1).await;
    let item = &view.items()[0];
    assert_eq!(item.title, "Buy milk");
    assert!(!item.completed);

    let writes = backends.documents.write_count();
    assert_eq!(
        home.add("Hi").unwrap_err(),
        Notice::error("Todo title must be at least 5 characters long.")
    );
    assert_eq!(backends.documents.write_count(), writes);
    assert_eq!(backends.documents.len(), 1);
}

#[tokio::test]
async fn sign_out_during_toggle_clears_cache_and_drops_outcome() {
    let backends = Backends::in_memory();
    let root = backends.launch().await;
    AuthScreen::new(root.state().auth.clone())
        .sign_up("a@b.com", "secret1", "secret1")
        .await;
    expect_route(&root, Route::Home).await;

    let mut home = HomeScreen::mount(root.state().clone());
    home.add("Buy milk").unwrap().await.unwrap();
    let view = expect_view(&mut home, |v| v.items().len() == 1).await;
    let id = view.items()[0].id.clone();

    // hold the toggle in flight, and make it fail when it lands
    backends
        .documents
        .set_write_delay(Some(Duration::from_millis(100)));
    let pending = home.toggle(&id);
    backends.documents.fail_writes(true);

    assert_eq!(home.log_out().await, Notice::success("Logged out successfully"));
    expect_route(&root, Route::Auth).await;
    assert_eq!(root.state().session.load().unwrap(), None);
    assert!(!pending.is_finished());

    // the route change unmounts the screen before the write settles
    drop(home);
    pending.await.expect("write task panicked");
    assert!(!backends.documents.get(&id).unwrap().completed);
}

#[tokio::test]
async fn in_flight_write_still_lands_after_unmount() {
    let backends = Backends::in_memory();
    let root = backends.launch().await;
    AuthScreen::new(root.state().auth.clone())
        .sign_up("a@b.com", "secret1", "secret1")
        .await;
    expect_route(&root, Route::Home).await;

    let mut home = HomeScreen::mount(root.state().clone());
    home.add("Buy milk").unwrap().await.unwrap();
    let view = expect_view(&mut home, |v| v.items().len() == 1).await;
    let id = view.items()[0].id.clone();

    backends
        .documents
        .set_write_delay(Some(Duration::from_millis(50)));
    let pending = home.toggle(&id);
    drop(home);

    pending.await.expect("write task panicked");
    assert!(backends.documents.get(&id).unwrap().completed);
}

#[tokio::test]
async fn two_sessions_see_each_others_writes() {
    let backends = Backends::in_memory();
    backends
        .provider
        .sign_up("a@b.com", "secret1")
        .await
        .unwrap();
    backends
        .provider
        .sign_up("c@d.com", "secret2")
        .await
        .unwrap();

    // separate caches, shared provider and collection
    let other = Backends {
        provider: backends.provider.clone(),
        documents: backends.documents.clone(),
        storage: Arc::new(MemoryStore::new()),
    };

    let first = backends.launch().await;
    let second = other.launch().await;
    AuthScreen::new(first.state().auth.clone())
        .log_in("a@b.com", "secret1")
        .await;
    AuthScreen::new(second.state().auth.clone())
        .log_in("c@d.com", "secret2")
        .await;
    expect_route(&first, Route::Home).await;
    expect_route(&second, Route::Home).await;

    let first_home = HomeScreen::mount(first.state().clone());
    let mut second_home = HomeScreen::mount(second.state().clone());

    first_home.add("Shared todo").unwrap().await.unwrap();
    let view = expect_view(&mut second_home, |v| v.items().len() == 1).await;
    assert_eq!(view.items()[0].title, "Shared todo");
}

#[tokio::test]
async fn session_refreshes_while_list_is_open() {
    let backends = Backends {
        provider: Arc::new(
            MemoryIdentityProvider::new().with_token_ttl(chrono::Duration::seconds(3)),
        ),
        ..Backends::in_memory()
    };
    let root = backends
        .launch_with(Config {
            session_refresh_lead_ms: 2_500,
            ..Config::default()
        })
        .await;
    let original = root
        .state()
        .auth
        .sign_up("a@b.com", "secret1", "secret1")
        .await
        .unwrap();
    expect_route(&root, Route::Home).await;

    let mut home = HomeScreen::mount(root.state().clone());
    expect_view(&mut home, |v| *v == ListView::Ready(Vec::new())).await;

    // the old token is still valid when the new one reaches the store
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let token = backends.documents.access_token();
            if token.is_some() && token.as_deref() != original.access_token() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("store never received a refreshed token");
    assert!(!original.credentials.as_ref().unwrap().is_expired());
    assert_eq!(root.route(), Route::Home);

    home.add("Buy milk").unwrap().await.unwrap();
    let view = expect_view(&mut home, |v| v.items().len() == 1).await;
    assert_eq!(view.items()[0].title, "Buy milk");
}
