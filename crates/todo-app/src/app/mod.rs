//! Application wiring: shared state, root controller, and the CLI surface.

pub mod commands;
mod root;
mod shell;
mod state;

pub use root::{RootController, Route};
pub use shell::Shell;
pub use state::AppState;
