//! Authentication state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!                 RestoreStarted            SessionExpired
//! ┌───────────┐ ───────────────► Restoring ───────────────► Refreshing
//! │ SignedOut │ ◄─────────────── (NoSession)     │               │
//! └───────────┘                                  │ SessionValid  │ RefreshSuccess
//!   │       │ SignInAttempt / SignUpAttempt      ▼               ▼
//!   │       └──────────────► SigningIn / SigningUp ──────► ┌──────────┐
//!   │                          AuthSucceeded               │ SignedIn │
//!   │ ◄────────────────────── AuthFailed                   └──────────┘
//!   │                                                         │
//!   │ ◄──── SignOutComplete ──── SigningOut ◄─ SignOutRequested┘
//!   │                              │ SignOutFailed ─► SignedIn
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub auth_machine(SignedOut)

    SignedOut => {
        RestoreStarted => Restoring,
        SignInAttempt => SigningIn,
        SignUpAttempt => SigningUp
    },
    Restoring => {
        SessionValid => SignedIn,
        SessionExpired => Refreshing,
        NoSession => SignedOut
    },
    SigningIn => {
        AuthSucceeded => SignedIn,
        AuthFailed => SignedOut
    },
    SigningUp => {
        AuthSucceeded => SignedIn,
        AuthFailed => SignedOut
    },
    SignedIn => {
        TokenExpired => Refreshing,
        SignOutRequested => SigningOut
    },
    Refreshing => {
        RefreshSuccess => SignedIn,
        RefreshRetry => Refreshing,
        RefreshFailed => SignedOut
    },
    SigningOut => {
        SignOutComplete => SignedOut,
        SignOutFailed => SignedIn
    }
}

pub use auth_machine::Input as AuthMachineInput;
pub use auth_machine::State as AuthMachineState;
pub use auth_machine::StateMachine as AuthMachine;

/// Simplified view of the FSM state for display and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthState {
    SignedOut,
    Restoring,
    SigningIn,
    SigningUp,
    SignedIn,
    Refreshing,
    SigningOut,
}

impl AuthState {
    /// Returns true if the user has a usable session (SignedIn state only).
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::SignedIn)
    }

    /// Returns true if an auth operation is in progress.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            AuthState::Restoring
                | AuthState::SigningIn
                | AuthState::SigningUp
                | AuthState::Refreshing
                | AuthState::SigningOut
        )
    }
}

impl fmt::Display for AuthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AuthState::SignedOut => "signed out",
            AuthState::Restoring => "restoring",
            AuthState::SigningIn => "signing in",
            AuthState::SigningUp => "signing up",
            AuthState::SignedIn => "signed in",
            AuthState::Refreshing => "refreshing",
            AuthState::SigningOut => "signing out",
        };
        f.write_str(label)
    }
}

impl From<&AuthMachineState> for AuthState {
    fn from(state: &AuthMachineState) -> Self {
        match state {
            AuthMachineState::SignedOut => AuthState::SignedOut,
            AuthMachineState::Restoring => AuthState::Restoring,
            AuthMachineState::SigningIn => AuthState::SigningIn,
            AuthMachineState::SigningUp => AuthState::SigningUp,
            AuthMachineState::SignedIn => AuthState::SignedIn,
            AuthMachineState::Refreshing => AuthState::Refreshing,
            AuthMachineState::SigningOut => AuthState::SigningOut,
        }
    }
}

/// Configuration for retry behavior during token refresh.
#[derive(Debug, Clone)]
pub struct RefreshConfig {
    /// Maximum number of attempts.
    pub max_retries: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between retries in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
        }
    }
}

impl RefreshConfig {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self
            .initial_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}
