//! Authentication for todo-sync.
//!
//! This crate provides:
//! - The [`IdentityProvider`] boundary with Supabase and in-memory implementations
//! - [`AuthClient`], which owns the current identity and notifies observers
//! - An explicit FSM-based auth state
//! - User-facing failure messages for the sign-in and sign-up forms

mod auth_fsm;
mod client;
mod error;
mod memory;
mod messages;
mod provider;
mod supabase;

pub use auth_fsm::auth_machine;
pub use auth_fsm::{AuthMachine, AuthMachineInput, AuthMachineState, AuthState, RefreshConfig};
pub use client::{AuthClient, AuthSubscription};
pub use error::{AuthError, AuthResult};
pub use memory::MemoryIdentityProvider;
pub use messages::{sign_in_failure_message, sign_up_failure_message, SIGN_IN_FAILED, SIGN_UP_FAILED};
pub use provider::IdentityProvider;
pub use supabase::SupabaseAuthProvider;
pub use todo_storage::{Credentials, Identity};
