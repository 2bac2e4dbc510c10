//! todo-sync - Todo list client with Supabase sign-in and live updates.

mod app;
mod notice;
mod render;
mod screens;

#[cfg(test)]
mod tests;

use std::path::PathBuf;

use app::commands;
use app::{AppState, RootController, Shell};
use clap::{Parser, Subcommand};
use todo_config_and_utils::{init_logging, BackendKind, Config, Paths};

/// todo-sync command-line interface.
#[derive(Parser)]
#[command(name = "todo-sync")]
#[command(about = "Todo list synced through Supabase, with live updates")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Log level (trace, debug, info, warn, error). Defaults to the config file value
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Base directory for runtime files (session, logs, config). Defaults to ~/.todo-sync
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Backend to talk to (supabase, memory)
    #[arg(long, global = true, env = "TODO_SYNC_BACKEND")]
    backend: Option<BackendKind>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account and log in
    Signup {
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "TODO_SYNC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Defaults to --password when that is given
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Log in with email and password
    Login {
        email: String,
        /// Read from stdin when omitted
        #[arg(long, env = "TODO_SYNC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log out and forget the cached session
    Logout,
    /// Show who is logged in
    Status,
    /// Print all todos, newest first
    List,
    /// Add a todo
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Change the title of a todo
    Edit {
        /// Position in `list` output, or the todo id
        target: String,
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
    },
    /// Mark a todo done or not done
    Toggle {
        /// Position in `list` output, or the todo id
        target: String,
        /// Completion state you last saw; writes its negation without re-reading
        #[arg(long)]
        from: Option<bool>,
    },
    /// Delete a todo
    Delete {
        /// Position in `list` output, or the todo id
        target: String,
    },
    /// Print the list every time it changes
    Watch,
    /// Interactive session (the default)
    Shell {
        /// Delete without asking for confirmation
        #[arg(long)]
        no_confirm: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    let mut config = Config::load(&paths)?;
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }

    // Initialize logging
    let log_level = cli.log_level.unwrap_or_else(|| config.log_level.clone());
    init_logging(&log_level, &paths);

    let state = AppState::build(config, paths)?;
    let root = RootController::mount(state).await;

    match cli.command {
        Some(Commands::Signup {
            email,
            password,
            confirm_password,
        }) => {
            let confirm_password = confirm_password.or_else(|| password.clone());
            let password = commands::password_or_prompt(password, "Password")?;
            let confirm_password =
                commands::password_or_prompt(confirm_password, "Confirm password")?;
            commands::sign_up(&root, &email, &password, &confirm_password).await?;
        }
        Some(Commands::Login { email, password }) => {
            let password = commands::password_or_prompt(password, "Password")?;
            commands::log_in(&root, &email, &password).await?;
        }
        Some(Commands::Logout) => commands::log_out_command(&root).await?,
        Some(Commands::Status) => commands::status(&root),
        Some(Commands::List) => commands::list(&root).await?,
        Some(Commands::Add { title }) => commands::add(&root, &title.join(" ")).await?,
        Some(Commands::Edit { target, title }) => {
            commands::edit(&root, &target, &title.join(" ")).await?
        }
        Some(Commands::Toggle { target, from }) => commands::toggle(&root, &target, from).await?,
        Some(Commands::Delete { target }) => commands::delete(&root, &target).await?,
        Some(Commands::Watch) => commands::watch(&root).await?,
        Some(Commands::Shell { no_confirm }) => Shell::new(root, !no_confirm).run().await?,
        None => Shell::new(root, true).run().await?,
    }

    Ok(())
}
