//! Auth client with FSM-based state tracking and identity observers.
//!
//! [`AuthClient`] owns the current identity. Every change is published on a
//! `watch` channel; [`AuthClient::observe_auth_state`] turns that channel into
//! callbacks. The FSM tracks the transient states (signing in, refreshing,
//! signing out) that the identity alone cannot express.

use crate::auth_fsm::{AuthMachine, AuthMachineInput, AuthState, RefreshConfig};
use crate::{AuthError, AuthResult, Identity, IdentityProvider};
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use todo_config_and_utils::{validate_sign_up, ValidationError};
use tokio::sync::{watch, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Shortest pause between two background refresh attempts.
const MIN_REFRESH_SPACING: Duration = Duration::from_secs(1);

/// Registration returned by [`AuthClient::observe_auth_state`].
///
/// The callback stops firing when this is dropped or unsubscribed.
pub struct AuthSubscription {
    task: JoinHandle<()>,
}

impl AuthSubscription {
    pub fn unsubscribe(self) {}
}

impl Drop for AuthSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Client for the identity provider.
pub struct AuthClient {
    provider: Arc<dyn IdentityProvider>,
    fsm: Mutex<AuthMachine>,
    identity: watch::Sender<Option<Identity>>,
    refresh_config: RefreshConfig,
    /// Held for the duration of a token refresh so concurrent callers wait
    /// for it instead of starting their own.
    refreshing: AsyncMutex<()>,
}

impl AuthClient {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self::with_refresh_config(provider, RefreshConfig::default())
    }

    pub fn with_refresh_config(
        provider: Arc<dyn IdentityProvider>,
        refresh_config: RefreshConfig,
    ) -> Self {
        let (identity, _) = watch::channel(None);
        Self {
            provider,
            fsm: Mutex::new(AuthMachine::new()),
            identity,
            refresh_config,
            refreshing: AsyncMutex::new(()),
        }
    }

    /// Get the current FSM state.
    pub fn auth_state(&self) -> AuthState {
        AuthState::from(self.fsm.lock().state())
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    fn transition(&self, input: &AuthMachineInput) -> AuthResult<AuthState> {
        let mut fsm = self.fsm.lock();
        let old_state = AuthState::from(fsm.state());

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        let new_state = AuthState::from(fsm.state());
        if old_state != new_state {
            debug!(old_state = ?old_state, new_state = ?new_state, "Auth state transition");
        }
        Ok(new_state)
    }

    fn publish(&self, identity: Option<Identity>) {
        self.identity.send_replace(identity);
    }

    /// Call `callback` with the current identity right away and again after
    /// every sign-in, sign-out or token refresh.
    ///
    /// Must be called within a Tokio runtime. Rapid successive changes may be
    /// coalesced; the callback always sees the latest identity.
    pub fn observe_auth_state<F>(&self, callback: F) -> AuthSubscription
    where
        F: Fn(Option<Identity>) + Send + Sync + 'static,
    {
        let mut rx = self.identity.subscribe();
        callback(rx.borrow_and_update().clone());

        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let identity = rx.borrow_and_update().clone();
                callback(identity);
            }
        });

        AuthSubscription { task }
    }

    /// Sign in with email and password.
    ///
    /// FSM: SignedOut -> SigningIn -> (SignedIn | SignedOut)
    pub async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let email = email.trim();
        if email.is_empty() {
            return Err(ValidationError::MissingField("email").into());
        }
        if password.is_empty() {
            return Err(ValidationError::MissingField("password").into());
        }

        self.transition(&AuthMachineInput::SignInAttempt)?;

        match self.provider.sign_in(email, password).await {
            Ok(identity) => {
                self.transition(&AuthMachineInput::AuthSucceeded)?;
                info!(user_id = %identity.user_id, "Signed in");
                self.publish(Some(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                let _ = self.transition(&AuthMachineInput::AuthFailed);
                Err(e)
            }
        }
    }

    /// Create an account and sign in as it.
    ///
    /// Input is checked locally first; a rejected form never reaches the
    /// provider.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        confirm_password: &str,
    ) -> AuthResult<Identity> {
        validate_sign_up(email, password, confirm_password)?;

        self.transition(&AuthMachineInput::SignUpAttempt)?;

        match self.provider.sign_up(email.trim(), password).await {
            Ok(identity) => {
                self.transition(&AuthMachineInput::AuthSucceeded)?;
                info!(user_id = %identity.user_id, "Signed up");
                self.publish(Some(identity.clone()));
                Ok(identity)
            }
            Err(e) => {
                warn!(error = %e, "Sign-up failed");
                let _ = self.transition(&AuthMachineInput::AuthFailed);
                Err(e)
            }
        }
    }

    /// Sign out and publish `None`.
    ///
    /// A transient failure to reach the provider keeps the session and is
    /// returned. Any other rejection means the server no longer knows the
    /// session, so the local sign-out proceeds.
    pub async fn sign_out(&self) -> AuthResult<()> {
        let Some(identity) = self.current_identity() else {
            debug!("Sign-out requested without a session");
            return Ok(());
        };

        self.transition(&AuthMachineInput::SignOutRequested)?;

        match self.provider.sign_out(&identity).await {
            Ok(()) => {}
            Err(e) if e.is_transient() => {
                warn!(error = %e, "Sign-out failed, keeping session");
                let _ = self.transition(&AuthMachineInput::SignOutFailed);
                return Err(e);
            }
            Err(e) => {
                warn!(error = %e, "Session revocation rejected, signing out locally");
            }
        }

        let _ = self.transition(&AuthMachineInput::SignOutComplete);
        self.publish(None);
        info!(user_id = %identity.user_id, "Signed out");
        Ok(())
    }

    /// Resume a cached session.
    ///
    /// FSM:
    /// - SignedOut -> Restoring -> NoSession -> SignedOut
    /// - SignedOut -> Restoring -> SessionValid -> SignedIn
    /// - SignedOut -> Restoring -> SessionExpired -> Refreshing -> (SignedIn | SignedOut)
    ///
    /// A failed refresh publishes `None` and returns the error.
    pub async fn restore(&self, cached: Option<Identity>) -> AuthResult<Option<Identity>> {
        self.transition(&AuthMachineInput::RestoreStarted)?;

        let Some(identity) = cached else {
            info!("No cached session");
            self.transition(&AuthMachineInput::NoSession)?;
            self.publish(None);
            return Ok(None);
        };

        let expired = identity
            .credentials
            .as_ref()
            .is_some_and(|c| c.is_expired());

        if !expired {
            self.transition(&AuthMachineInput::SessionValid)?;
            info!(user_id = %identity.user_id, "Restored cached session");
            self.publish(Some(identity.clone()));
            return Ok(Some(identity));
        }

        info!(user_id = %identity.user_id, "Cached session expired, attempting refresh");
        self.transition(&AuthMachineInput::SessionExpired)?;
        self.refresh_with_backoff(&identity).await.map(Some)
    }

    /// A usable bearer token, refreshing first if it has expired.
    pub async fn access_token(&self) -> AuthResult<String> {
        self.token_valid_for(ChronoDuration::zero()).await
    }

    /// A bearer token that stays valid for at least `lead`, refreshing the
    /// session otherwise.
    ///
    /// Only one refresh runs at a time. Callers that arrive while one is in
    /// flight wait for it and reuse its token.
    pub async fn token_valid_for(&self, lead: ChronoDuration) -> AuthResult<String> {
        if let Some(token) = self.unexpired_token(lead)? {
            return Ok(token);
        }

        let _refreshing = self.refreshing.lock().await;
        if let Some(token) = self.unexpired_token(lead)? {
            debug!("Token refreshed by a concurrent caller");
            return Ok(token);
        }
        let identity = self.current_identity().ok_or(AuthError::NotLoggedIn)?;

        info!(user_id = %identity.user_id, "Token expiring, attempting refresh");
        self.transition(&AuthMachineInput::TokenExpired)?;
        let fresh = self.refresh_with_backoff(&identity).await?;
        fresh
            .access_token()
            .map(str::to_string)
            .ok_or(AuthError::NotLoggedIn)
    }

    fn unexpired_token(&self, lead: ChronoDuration) -> AuthResult<Option<String>> {
        let identity = self.current_identity().ok_or(AuthError::NotLoggedIn)?;
        let credentials = identity
            .credentials
            .as_ref()
            .ok_or(AuthError::NotLoggedIn)?;
        Ok((!credentials.expires_within(lead)).then(|| credentials.access_token.clone()))
    }

    /// Refresh the session `lead` ahead of every token expiry, for as long
    /// as the returned future is polled.
    ///
    /// Each refresh is published like any other identity change, so
    /// observers pick up the new token. A refresh the provider rejects
    /// signs out, as it does for [`AuthClient::access_token`].
    pub async fn keep_session_fresh(&self, lead: ChronoDuration) {
        let mut identities = self.identity.subscribe();

        loop {
            let expires_at = identities
                .borrow_and_update()
                .as_ref()
                .and_then(|identity| identity.credentials.as_ref())
                .map(|credentials| credentials.expires_at);

            let Some(expires_at) = expires_at else {
                if identities.changed().await.is_err() {
                    return;
                }
                continue;
            };

            let wait = expires_at
                .checked_sub_signed(lead)
                .and_then(|refresh_at| (refresh_at - Utc::now()).to_std().ok())
                .unwrap_or_default()
                .max(MIN_REFRESH_SPACING);

            tokio::select! {
                changed = identities.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(wait) => {
                    if let Err(e) = self.token_valid_for(lead).await {
                        warn!(error = %e, "Background session refresh failed");
                    }
                }
            }
        }
    }

    /// Refresh with exponential backoff on transient errors.
    ///
    /// Must be entered in the Refreshing state.
    async fn refresh_with_backoff(&self, identity: &Identity) -> AuthResult<Identity> {
        let mut last_error = None;

        for attempt in 0..self.refresh_config.max_retries {
            match self.provider.refresh(identity).await {
                Ok(fresh) => {
                    self.transition(&AuthMachineInput::RefreshSuccess)?;
                    info!(user_id = %fresh.user_id, "Session refreshed");
                    self.publish(Some(fresh.clone()));
                    return Ok(fresh);
                }
                Err(e) if e.is_transient() => {
                    last_error = Some(e);

                    if attempt + 1 < self.refresh_config.max_retries {
                        let _ = self.transition(&AuthMachineInput::RefreshRetry);

                        let delay = self.refresh_config.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_retries = self.refresh_config.max_retries,
                            delay_ms = delay.as_millis(),
                            "Refresh failed with transient error, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => {
                    warn!("Refresh failed with non-transient error: {}", e);
                    let _ = self.transition(&AuthMachineInput::RefreshFailed);
                    self.publish(None);
                    return Err(e);
                }
            }
        }

        warn!(
            "Refresh failed after {} attempts",
            self.refresh_config.max_retries
        );
        let _ = self.transition(&AuthMachineInput::RefreshFailed);
        self.publish(None);

        Err(last_error.unwrap_or(AuthError::RefreshExhausted(
            self.refresh_config.max_retries,
        )))
    }
}
