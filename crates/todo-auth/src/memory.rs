//! In-process identity provider.

use crate::{AuthError, AuthResult, Credentials, Identity, IdentityProvider};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use todo_config_and_utils::MIN_PASSWORD_LEN;
use uuid::Uuid;

struct Account {
    user_id: String,
    email: String,
    password: String,
}

#[derive(Default)]
struct Accounts {
    /// Keyed by lowercased email.
    by_email: HashMap<String, Account>,
    /// Live refresh tokens and the user they belong to.
    refresh_tokens: HashMap<String, String>,
}

/// Identity provider that keeps accounts in memory.
///
/// Applies the same rules as the hosted service: syntactically valid email,
/// unique email, minimum password length. Set `unavailable` to simulate a
/// network outage.
pub struct MemoryIdentityProvider {
    accounts: Mutex<Accounts>,
    token_ttl: Duration,
    unavailable: AtomicBool,
    refresh_delay: Mutex<Option<std::time::Duration>>,
}

impl Default for MemoryIdentityProvider {
    fn default() -> Self {
        Self {
            accounts: Mutex::new(Accounts::default()),
            token_ttl: Duration::hours(1),
            unavailable: AtomicBool::new(false),
            refresh_delay: Mutex::new(None),
        }
    }
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lifetime of issued access tokens. A negative value issues tokens that
    /// are already expired.
    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token_ttl = ttl;
        self
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Hold every refresh this long before answering it.
    pub fn set_refresh_delay(&self, delay: Option<std::time::Duration>) {
        *self.refresh_delay.lock() = delay;
    }

    pub fn account_count(&self) -> usize {
        self.accounts.lock().by_email.len()
    }

    fn check_available(&self) -> AuthResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AuthError::NetworkUnavailable);
        }
        Ok(())
    }

    fn issue(&self, accounts: &mut Accounts, user_id: &str, email: &str) -> Identity {
        let refresh_token = Uuid::new_v4().to_string();
        accounts
            .refresh_tokens
            .insert(refresh_token.clone(), user_id.to_string());

        Identity::new(user_id, Some(email.to_string())).with_credentials(Credentials {
            access_token: Uuid::new_v4().to_string(),
            refresh_token,
            expires_at: Utc::now() + self.token_ttl,
        })
    }
}

fn is_valid_email(email: &str) -> bool {
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && !email.chars().any(char::is_whitespace)
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        _ => false,
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        self.check_available()?;
        let mut accounts = self.accounts.lock();

        let (user_id, email) = match accounts.by_email.get(&email.trim().to_lowercase()) {
            Some(account) if account.password == password => {
                (account.user_id.clone(), account.email.clone())
            }
            _ => {
                return Err(AuthError::InvalidCredentials(
                    "Invalid login credentials".to_string(),
                ))
            }
        };

        Ok(self.issue(&mut accounts, &user_id, &email))
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity> {
        self.check_available()?;
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword);
        }

        let mut accounts = self.accounts.lock();
        let key = email.to_lowercase();
        if accounts.by_email.contains_key(&key) {
            return Err(AuthError::EmailInUse);
        }

        let user_id = Uuid::new_v4().to_string();
        accounts.by_email.insert(
            key,
            Account {
                user_id: user_id.clone(),
                email: email.to_string(),
                password: password.to_string(),
            },
        );
        tracing::debug!(user_id = %user_id, "created in-memory account");

        Ok(self.issue(&mut accounts, &user_id, email))
    }

    async fn sign_out(&self, identity: &Identity) -> AuthResult<()> {
        self.check_available()?;
        if let Some(credentials) = &identity.credentials {
            self.accounts
                .lock()
                .refresh_tokens
                .remove(&credentials.refresh_token);
        }
        Ok(())
    }

    async fn refresh(&self, identity: &Identity) -> AuthResult<Identity> {
        let delay = *self.refresh_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.check_available()?;
        let credentials = identity.credentials.as_ref().ok_or(AuthError::NotLoggedIn)?;

        let mut accounts = self.accounts.lock();
        let user_id = accounts
            .refresh_tokens
            .remove(&credentials.refresh_token)
            .ok_or_else(|| AuthError::TokenRefresh("Invalid Refresh Token".to_string()))?;

        let email = accounts
            .by_email
            .values()
            .find(|a| a.user_id == user_id)
            .map(|a| a.email.clone())
            .ok_or_else(|| AuthError::TokenRefresh("User not found".to_string()))?;

        Ok(self.issue(&mut accounts, &user_id, &email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("a@b.com"));
        assert!(!is_valid_email("ab.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a@@b.com"));
        assert!(!is_valid_email("@b.com"));
        assert!(!is_valid_email("a b@c.com"));
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let provider = MemoryIdentityProvider::new();
        let created = provider.sign_up("a@b.com", "secret1").await.unwrap();
        assert!(created.credentials.is_some());

        let signed_in = provider.sign_in("A@B.com", "secret1").await.unwrap();
        assert_eq!(signed_in.user_id, created.user_id);
        assert_ne!(signed_in.access_token(), created.access_token());
    }

    #[tokio::test]
    async fn test_sign_up_errors() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up("a@b.com", "secret1").await.unwrap();

        assert!(matches!(
            provider.sign_up("a@b.com", "secret2").await,
            Err(AuthError::EmailInUse)
        ));
        assert!(matches!(
            provider.sign_up("not-an-email", "secret1").await,
            Err(AuthError::InvalidEmail)
        ));
        assert!(matches!(
            provider.sign_up("c@d.com", "123").await,
            Err(AuthError::WeakPassword)
        ));
        assert_eq!(provider.account_count(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_wrong_password() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up("a@b.com", "secret1").await.unwrap();

        assert!(matches!(
            provider.sign_in("a@b.com", "wrong!").await,
            Err(AuthError::InvalidCredentials(_))
        ));
        assert!(matches!(
            provider.sign_in("x@b.com", "secret1").await,
            Err(AuthError::InvalidCredentials(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let provider = MemoryIdentityProvider::new().with_token_ttl(Duration::seconds(-1));
        let identity = provider.sign_up("a@b.com", "secret1").await.unwrap();
        assert!(identity.credentials.as_ref().unwrap().is_expired());

        let refreshed = provider.refresh(&identity).await.unwrap();
        assert_eq!(refreshed.user_id, identity.user_id);

        // the old refresh token is spent
        assert!(matches!(
            provider.refresh(&identity).await,
            Err(AuthError::TokenRefresh(_))
        ));
    }

    #[tokio::test]
    async fn test_sign_out_revokes_refresh_token() {
        let provider = MemoryIdentityProvider::new();
        let identity = provider.sign_up("a@b.com", "secret1").await.unwrap();
        provider.sign_out(&identity).await.unwrap();

        assert!(provider.refresh(&identity).await.is_err());
    }

    #[tokio::test]
    async fn test_unavailable() {
        let provider = MemoryIdentityProvider::new();
        provider.set_unavailable(true);
        let err = provider.sign_up("a@b.com", "secret1").await.unwrap_err();
        assert!(err.is_transient());
    }
}
