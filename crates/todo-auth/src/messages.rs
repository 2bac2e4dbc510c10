//! User-facing notices for auth failures.

use crate::AuthError;

pub const SIGN_IN_FAILED: &str = "Login failed. Please try again.";
pub const SIGN_UP_FAILED: &str = "Sign Up failed. Please try again.";

/// Every sign-in failure reads the same to the user.
pub fn sign_in_failure_message(_err: &AuthError) -> &'static str {
    SIGN_IN_FAILED
}

/// Sign-up failures are told apart where the user can act on them.
pub fn sign_up_failure_message(err: &AuthError) -> String {
    match err {
        AuthError::Validation(e) => e.to_string(),
        AuthError::EmailInUse => "Email is already in use".to_string(),
        AuthError::InvalidEmail => "Invalid email address".to_string(),
        AuthError::WeakPassword => "Password is too weak".to_string(),
        AuthError::ConfirmationRequired => {
            "Check your inbox to confirm your email, then log in".to_string()
        }
        _ => SIGN_UP_FAILED.to_string(),
    }
}
