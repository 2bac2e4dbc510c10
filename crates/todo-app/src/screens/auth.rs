//! Login and sign-up forms.

use crate::notice::Notice;
use std::sync::Arc;
use todo_auth::{sign_in_failure_message, sign_up_failure_message, AuthClient, AuthError};
use tracing::error;

/// Which form is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Login,
    SignUp,
}

pub struct AuthScreen {
    auth: Arc<AuthClient>,
    mode: Mode,
}

impl AuthScreen {
    pub fn new(auth: Arc<AuthClient>) -> Self {
        Self {
            auth,
            mode: Mode::default(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn switch_mode(&mut self) -> Mode {
        self.mode = match self.mode {
            Mode::Login => Mode::SignUp,
            Mode::SignUp => Mode::Login,
        };
        self.mode
    }

    /// Submit the login form.
    ///
    /// Routing happens through the auth observer; this only reports.
    pub async fn log_in(&self, email: &str, password: &str) -> Notice {
        match self.auth.sign_in(email, password).await {
            Ok(_) => Notice::success("Login successful!"),
            Err(AuthError::Validation(e)) => Notice::error(e.to_string()),
            Err(e) => {
                error!(error = %e, "Login failed");
                Notice::error(sign_in_failure_message(&e))
            }
        }
    }

    /// Submit the sign-up form.
    pub async fn sign_up(&self, email: &str, password: &str, confirm_password: &str) -> Notice {
        match self.auth.sign_up(email, password, confirm_password).await {
            Ok(_) => Notice::success("Sign Up successful!"),
            Err(e) => {
                if !matches!(e, AuthError::Validation(_)) {
                    error!(error = %e, "Sign up failed");
                }
                Notice::error(sign_up_failure_message(&e))
            }
        }
    }
}
