//! Interactive shell.
//!
//! Shows the auth screen or the home screen depending on the route, reads
//! one command per line and re-renders the list on every live push.

use crate::app::{RootController, Route};
use crate::render::render_screen;
use crate::screens::{AuthScreen, HomeEvent, HomeScreen, Mode};
use std::future;
use todo_items::ItemId;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

const HELP_AUTH: &str = "\
Commands:
  login <email>         the password is asked for next
  signup <email>
  mode                  switch between login and sign-up
  quit";

const HELP_HOME: &str = "\
Commands:
  add <title>           add a todo (at least 5 characters)
  edit <n> <title>      change the title of todo n
  toggle <n>            mark todo n done or not done
  delete <n>            delete todo n
  list                  print the list again
  logout
  quit";

pub const DELETE_PROMPT: &str = "Are you sure you want to delete this todo? [y/N]";
pub const PASSWORD_PROMPT: &str = "Password:";
pub const CONFIRM_PROMPT: &str = "Confirm password:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Help,
    Quit,
    Mode,
    Login(String),
    SignUp(String),
    List,
    Add(String),
    Edit {
        position: usize,
        title: String,
    },
    Toggle(usize),
    Delete(usize),
    Logout,
}

fn parse_position(raw: Option<&str>) -> Result<usize, String> {
    raw.and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .ok_or_else(|| "Expected a todo number from the list".to_string())
}

/// Parse one input line. Titles keep their inner spacing.
pub fn parse_command(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (verb, rest) = line
        .split_once(char::is_whitespace)
        .map(|(verb, rest)| (verb, rest.trim()))
        .unwrap_or((line, ""));
    let mut args = rest.split_whitespace();

    match verb.to_ascii_lowercase().as_str() {
        "help" | "?" => Ok(ShellCommand::Help),
        "quit" | "exit" | "q" => Ok(ShellCommand::Quit),
        "mode" => Ok(ShellCommand::Mode),
        // passwords never come from the command line; they are asked for
        "login" => match (args.next(), args.next()) {
            (Some(email), None) => Ok(ShellCommand::Login(email.to_string())),
            _ => Err("Usage: login <email> (the password is asked for next)".to_string()),
        },
        "signup" => match (args.next(), args.next()) {
            (Some(email), None) => Ok(ShellCommand::SignUp(email.to_string())),
            _ => Err("Usage: signup <email> (the password is asked for next)".to_string()),
        },
        "list" | "ls" => Ok(ShellCommand::List),
        "add" => Ok(ShellCommand::Add(rest.to_string())),
        "edit" => {
            let (position, title) = rest
                .split_once(char::is_whitespace)
                .unwrap_or((rest, ""));
            Ok(ShellCommand::Edit {
                position: parse_position(Some(position))?,
                title: title.trim().to_string(),
            })
        }
        "toggle" | "done" => parse_position(args.next()).map(ShellCommand::Toggle),
        "delete" | "rm" => parse_position(args.next()).map(ShellCommand::Delete),
        "logout" => Ok(ShellCommand::Logout),
        "" => Err(String::new()),
        other => Err(format!("Unknown command: {} (try `help`)", other)),
    }
}

fn auth_banner(mode: Mode) -> String {
    match mode {
        Mode::Login => "Log in (or `mode` to sign up instead)".to_string(),
        Mode::SignUp => "Sign up (or `mode` to log in instead)".to_string(),
    }
}

pub enum Flow {
    Continue,
    Quit,
}

enum Active {
    Auth(AuthScreen),
    Home(HomeScreen),
}

/// A question the next input line answers.
enum Pending {
    Delete(ItemId),
    Password { email: String, mode: Mode },
    Confirm { email: String, password: String },
}

pub struct Shell {
    root: RootController,
    route: Route,
    active: Active,
    pending: Option<Pending>,
    confirm_deletes: bool,
}

impl Shell {
    pub fn new(root: RootController, confirm_deletes: bool) -> Self {
        let route = root.route();
        let active = Self::mount(&root, route);
        Self {
            root,
            route,
            active,
            pending: None,
            confirm_deletes,
        }
    }

    fn mount(root: &RootController, route: Route) -> Active {
        match route {
            Route::Home => Active::Home(HomeScreen::mount(root.state().clone())),
            Route::Auth | Route::Loading => Active::Auth(AuthScreen::new(root.state().auth.clone())),
        }
    }

    fn user(&self) -> String {
        self.root
            .state()
            .auth
            .current_identity()
            .map(|i| i.display_name().to_string())
            .unwrap_or_default()
    }

    /// What the current screen looks like right now.
    pub fn banner(&self) -> String {
        match &self.active {
            Active::Auth(screen) => auth_banner(screen.mode()),
            Active::Home(screen) => render_screen(&self.user(), &screen.view()),
        }
    }

    /// Swap screens if the route moved. Returns the new banner.
    pub fn sync_route(&mut self) -> Option<String> {
        let route = self.root.route();
        if route == self.route {
            return None;
        }
        debug!(from = ?self.route, to = ?route, "Route changed");
        // dropping the old screen unmounts it
        self.active = Self::mount(&self.root, route);
        self.route = route;
        self.pending = None;
        Some(self.banner())
    }

    fn position_to_id(screen: &HomeScreen, position: usize) -> Option<ItemId> {
        screen
            .view()
            .items()
            .get(position.wrapping_sub(1))
            .map(|item| item.id.clone())
    }

    async fn answer(&mut self, pending: Pending, line: &str) -> Vec<String> {
        match (pending, &mut self.active) {
            (Pending::Delete(id), Active::Home(screen)) => {
                let answer = line.trim().to_ascii_lowercase();
                if answer == "y" || answer == "yes" {
                    screen.delete(&id);
                    return Vec::new();
                }
                vec!["Cancelled".to_string()]
            }
            (
                Pending::Password {
                    email,
                    mode: Mode::Login,
                },
                Active::Auth(screen),
            ) => vec![screen.log_in(&email, line).await.to_string()],
            (
                Pending::Password {
                    email,
                    mode: Mode::SignUp,
                },
                Active::Auth(_),
            ) => {
                self.pending = Some(Pending::Confirm {
                    email,
                    password: line.to_string(),
                });
                vec![CONFIRM_PROMPT.to_string()]
            }
            (Pending::Confirm { email, password }, Active::Auth(screen)) => {
                vec![screen.sign_up(&email, &password, line).await.to_string()]
            }
            // the screen changed under the question
            _ => Vec::new(),
        }
    }

    /// Handle one line of input and return what to print.
    pub async fn handle_line(&mut self, line: &str) -> (Flow, Vec<String>) {
        if let Some(pending) = self.pending.take() {
            return (Flow::Continue, self.answer(pending, line).await);
        }

        let command = match parse_command(line) {
            Ok(command) => command,
            Err(message) if message.is_empty() => return (Flow::Continue, Vec::new()),
            Err(message) => return (Flow::Continue, vec![message]),
        };

        let confirm_deletes = self.confirm_deletes;
        let user = self.user();
        let output = match (&mut self.active, command) {
            (_, ShellCommand::Quit) => return (Flow::Quit, Vec::new()),
            (Active::Auth(_), ShellCommand::Help) => vec![HELP_AUTH.to_string()],
            (Active::Home(_), ShellCommand::Help) => vec![HELP_HOME.to_string()],

            (Active::Auth(screen), ShellCommand::Mode) => vec![auth_banner(screen.switch_mode())],
            (Active::Auth(_), ShellCommand::Login(email)) => {
                self.pending = Some(Pending::Password {
                    email,
                    mode: Mode::Login,
                });
                vec![PASSWORD_PROMPT.to_string()]
            }
            (Active::Auth(_), ShellCommand::SignUp(email)) => {
                self.pending = Some(Pending::Password {
                    email,
                    mode: Mode::SignUp,
                });
                vec![PASSWORD_PROMPT.to_string()]
            }
            (Active::Auth(_), _) => vec!["Log in first (try `help`)".to_string()],

            (Active::Home(screen), ShellCommand::List) => {
                vec![render_screen(&user, &screen.view())]
            }
            (Active::Home(screen), ShellCommand::Add(title)) => match screen.add(&title) {
                Ok(_) => Vec::new(),
                Err(notice) => vec![notice.to_string()],
            },
            (Active::Home(screen), ShellCommand::Edit { position, title }) => {
                match Self::position_to_id(screen, position) {
                    Some(id) => match screen.edit(&id, &title) {
                        Ok(_) => Vec::new(),
                        Err(notice) => vec![notice.to_string()],
                    },
                    None => vec![format!("No todo number {}", position)],
                }
            }
            (Active::Home(screen), ShellCommand::Toggle(position)) => {
                match Self::position_to_id(screen, position) {
                    Some(id) => {
                        screen.toggle(&id);
                        Vec::new()
                    }
                    None => vec![format!("No todo number {}", position)],
                }
            }
            (Active::Home(screen), ShellCommand::Delete(position)) => {
                match Self::position_to_id(screen, position) {
                    Some(id) if confirm_deletes => {
                        self.pending = Some(Pending::Delete(id));
                        vec![DELETE_PROMPT.to_string()]
                    }
                    Some(id) => {
                        screen.delete(&id);
                        Vec::new()
                    }
                    None => vec![format!("No todo number {}", position)],
                }
            }
            (Active::Home(screen), ShellCommand::Logout) => {
                vec![screen.log_out().await.to_string()]
            }
            (Active::Home(_), _) => vec!["Already logged in".to_string()],
        };

        (Flow::Continue, output)
    }

    /// Wait for the next push from the home screen; never resolves on the
    /// auth screen.
    async fn next_home_event(&mut self) -> Option<HomeEvent> {
        match &mut self.active {
            Active::Home(screen) => screen.next_event().await,
            Active::Auth(_) => future::pending().await,
        }
    }

    /// Run until `quit`, end of input or Ctrl-C.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut routes = self.root.routes();
        println!("{}", self.banner());

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        return Ok(());
                    };
                    let (flow, output) = self.handle_line(&line).await;
                    for text in output {
                        println!("{}", text);
                    }
                    if let Flow::Quit = flow {
                        return Ok(());
                    }
                }
                changed = routes.changed() => {
                    if changed.is_err() {
                        return Ok(());
                    }
                    if let Some(banner) = self.sync_route() {
                        println!("\n{}", banner);
                    }
                }
                event = self.next_home_event() => match event {
                    Some(HomeEvent::View(_)) => println!("\n{}", self.banner()),
                    Some(HomeEvent::Notice(notice)) => println!("{}", notice),
                    None => {}
                },
                _ = tokio::signal::ctrl_c() => return Ok(()),
            }
        }
    }
}
