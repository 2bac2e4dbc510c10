//! One-shot CLI commands.
//!
//! Each command mounts the root controller, does one thing, prints the
//! outcome and returns. Failures come back as errors so the exit status is
//! non-zero.

use crate::app::{RootController, Route};
use crate::notice::Notice;
use crate::render::render_list;
use crate::screens::{log_out, AuthScreen, HomeEvent, HomeScreen, ListView};
use anyhow::{anyhow, bail};
use std::io::{self, BufRead, Write};
use std::time::Duration;
use todo_items::{Item, ItemId};
use tracing::{info, warn};

/// How long a one-shot command waits for the session cache to catch up.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Print a success notice, or turn an error notice into an error.
fn report(notice: Notice) -> anyhow::Result<()> {
    if notice.is_error() {
        return Err(anyhow!(notice.message().to_string()));
    }
    println!("{}", notice);
    Ok(())
}

/// Read a secret from the flag or prompt for it on stdin.
pub fn password_or_prompt(value: Option<String>, prompt: &str) -> anyhow::Result<String> {
    if let Some(value) = value {
        return Ok(value);
    }
    print!("{}: ", prompt);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn require_signed_in(root: &RootController) -> anyhow::Result<()> {
    if root.route() != Route::Home {
        bail!("Not logged in. Run `todo-sync login` first.");
    }
    Ok(())
}

/// Resolve a list position (1-based, as printed by `list`) or a raw id.
pub fn resolve_target(items: &[Item], target: &str) -> ItemId {
    target
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=items.len()).contains(n))
        .map(|n| items[n - 1].id.clone())
        .unwrap_or_else(|| ItemId::from(target))
}

async fn resolve(root: &RootController, target: &str) -> anyhow::Result<ItemId> {
    let items = root.state().items.list().await?;
    Ok(resolve_target(&items, target))
}

pub async fn sign_up(
    root: &RootController,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> anyhow::Result<()> {
    let screen = AuthScreen::new(root.state().auth.clone());
    report(screen.sign_up(email, password, confirm_password).await)?;
    settle(root, Route::Home).await;
    Ok(())
}

pub async fn log_in(root: &RootController, email: &str, password: &str) -> anyhow::Result<()> {
    let screen = AuthScreen::new(root.state().auth.clone());
    report(screen.log_in(email, password).await)?;
    settle(root, Route::Home).await;
    Ok(())
}

pub async fn log_out_command(root: &RootController) -> anyhow::Result<()> {
    if root.route() != Route::Home {
        println!("Not logged in");
        return Ok(());
    }
    report(log_out(&root.state().auth).await)?;
    settle(root, Route::Auth).await;
    Ok(())
}

/// Let the auth observer persist the change before the process exits.
async fn settle(root: &RootController, route: Route) {
    if !root.wait_for_route(route, SETTLE_TIMEOUT).await {
        warn!(route = ?route, "Session cache did not settle before exit");
    }
}

pub fn status(root: &RootController) {
    let state = root.state();
    println!("Backend:    {}", state.config.backend);
    println!("Data dir:   {}", state.paths.base_dir().display());
    println!("Auth state: {}", state.auth.auth_state());
    match state.auth.current_identity() {
        Some(identity) => {
            println!("Logged in:  {}", identity.display_name());
            if let Some(credentials) = &identity.credentials {
                println!("Expires at: {}", credentials.expires_at.to_rfc3339());
            }
        }
        None => println!("Logged in:  no"),
    }
}

pub async fn list(root: &RootController) -> anyhow::Result<()> {
    require_signed_in(root)?;
    root.state().authorize_items().await;
    let items = root
        .state()
        .items
        .list()
        .await
        .map_err(|e| anyhow!(Notice::from_item_error(&e).message().to_string()))?;
    println!("{}", render_list(&ListView::Ready(items)));
    Ok(())
}

pub async fn add(root: &RootController, title: &str) -> anyhow::Result<()> {
    require_signed_in(root)?;
    root.state().authorize_items().await;
    match root.state().items.add(title).await {
        Ok(id) => {
            info!(item_id = %id, "Added todo from CLI");
            println!("Added {}", id);
            Ok(())
        }
        Err(e) => report(Notice::from_item_error(&e)),
    }
}

pub async fn edit(root: &RootController, target: &str, title: &str) -> anyhow::Result<()> {
    require_signed_in(root)?;
    root.state().authorize_items().await;
    let id = resolve(root, target).await?;
    match root.state().items.set_title(&id, title).await {
        Ok(()) => {
            println!("Updated {}", id);
            Ok(())
        }
        Err(e) => report(Notice::from_item_error(&e)),
    }
}

/// Flip a todo. With `from`, write `!from` instead of reading the stored
/// value first.
pub async fn toggle(root: &RootController, target: &str, from: Option<bool>) -> anyhow::Result<()> {
    require_signed_in(root)?;
    root.state().authorize_items().await;
    let id = resolve(root, target).await?;
    let result = match from {
        Some(current) => root.state().items.toggle_complete(&id, current).await,
        None => root.state().items.toggle(&id).await,
    };
    match result {
        Ok(completed) => {
            let label = if completed { "completed" } else { "not completed" };
            println!("{} is now {}", id, label);
            Ok(())
        }
        Err(e) => report(Notice::from_item_error(&e)),
    }
}

pub async fn delete(root: &RootController, target: &str) -> anyhow::Result<()> {
    require_signed_in(root)?;
    root.state().authorize_items().await;
    let id = resolve(root, target).await?;
    match root.state().items.remove(&id).await {
        Ok(()) => {
            println!("Deleted {}", id);
            Ok(())
        }
        Err(e) => report(Notice::from_item_error(&e)),
    }
}

/// Print the list on every push until Ctrl-C or sign-out.
pub async fn watch(root: &RootController) -> anyhow::Result<()> {
    require_signed_in(root)?;
    root.state().authorize_items().await;

    let mut routes = root.routes();
    let mut screen = HomeScreen::mount(root.state().clone());
    println!("{}", render_list(&screen.view()));

    loop {
        tokio::select! {
            event = screen.next_event() => match event {
                Some(HomeEvent::View(view)) => println!("\n{}", render_list(&view)),
                Some(HomeEvent::Notice(notice)) => eprintln!("{}", notice),
                None => return Ok(()),
            },
            changed = routes.changed() => {
                if changed.is_err() || *routes.borrow() != Route::Home {
                    println!("Logged out");
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}
