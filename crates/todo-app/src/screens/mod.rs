//! Screens the root controller switches between.

mod auth;
mod home;

pub use auth::{AuthScreen, Mode};
pub use home::{log_out, HomeEvent, HomeScreen, ListView};
