//! Input constraints shared by the auth and item clients.
//!
//! Both checks run before any network call so a rejected input never
//! reaches a backend.

use thiserror::Error;

/// Minimum number of characters in a trimmed todo title.
pub const MIN_TITLE_LEN: usize = 5;

/// Minimum password length accepted at sign-up.
pub const MIN_PASSWORD_LEN: usize = 6;

/// A local constraint violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Todo title must be at least {min} characters long.")]
    TitleTooShort { len: usize, min: usize },

    #[error("Password must be at least {min} characters")]
    PasswordTooShort { min: usize },

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Please fill in all fields")]
    MissingField(&'static str),
}

/// Trim `raw` and check it against [`MIN_TITLE_LEN`].
///
/// Length is counted in characters, not bytes. Returns the trimmed title.
pub fn validate_title(raw: &str) -> Result<String, ValidationError> {
    let title = raw.trim();
    let len = title.chars().count();
    if len < MIN_TITLE_LEN {
        return Err(ValidationError::TitleTooShort {
            len,
            min: MIN_TITLE_LEN,
        });
    }
    Ok(title.to_string())
}

/// Check sign-up input: every field present, then matching passwords, then
/// password length.
pub fn validate_sign_up(
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationError> {
    if email.trim().is_empty() {
        return Err(ValidationError::MissingField("email"));
    }
    if password.is_empty() {
        return Err(ValidationError::MissingField("password"));
    }
    if confirm_password.is_empty() {
        return Err(ValidationError::MissingField("confirm_password"));
    }
    if password != confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
        });
    }
    Ok(())
}
