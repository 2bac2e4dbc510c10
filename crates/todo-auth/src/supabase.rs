//! Supabase Auth (GoTrue) REST client.

use crate::{AuthError, AuthResult, Credentials, Identity, IdentityProvider};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Supabase token request for the refresh grant.
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

#[derive(Debug, Serialize)]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
}

/// Supabase session response (password grant, refresh grant, auto-confirmed sign-up).
#[derive(Debug, Deserialize)]
struct SessionResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: UserResponse,
}

#[derive(Debug, Deserialize)]
struct UserResponse {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Sign-up answers with a session when email confirmation is disabled and
/// with the bare user otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(SessionResponse),
    User(UserResponse),
}

/// Error body shapes returned by GoTrue.
///
/// Newer versions send `{code, error_code, msg}`; the token endpoint still
/// sends the OAuth style `{error, error_description}`.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Map a non-success GoTrue response to an [`AuthError`].
pub(crate) fn map_error_response(status: u16, body: &str) -> AuthError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();

    let code = parsed
        .error_code
        .or_else(|| match parsed.code {
            Some(serde_json::Value::String(code)) => Some(code),
            _ => None,
        })
        .or_else(|| parsed.error.clone());

    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| {
            if body.trim().is_empty() {
                format!("HTTP {}", status)
            } else {
                body.trim().to_string()
            }
        });

    match code.clone().as_deref() {
        Some("user_already_exists") | Some("email_exists") => AuthError::EmailInUse,
        Some("email_address_invalid") => AuthError::InvalidEmail,
        // also sent for other fields; only the email case has its own message
        Some("validation_failed") if message.to_lowercase().contains("email") => {
            AuthError::InvalidEmail
        }
        Some("weak_password") => AuthError::WeakPassword,
        Some("invalid_credentials") | Some("invalid_grant") => {
            AuthError::InvalidCredentials(message)
        }
        _ => AuthError::Provider {
            status,
            code,
            message,
        },
    }
}

impl SessionResponse {
    fn into_identity(self) -> Identity {
        let expires_at = Utc::now() + Duration::seconds(self.expires_in);
        Identity::new(self.user.id, self.user.email).with_credentials(Credentials {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_at,
        })
    }
}

/// Identity provider backed by Supabase Auth.
pub struct SupabaseAuthProvider {
    http_client: Client,
    supabase_url: String,
    supabase_publishable_key: String,
}

impl SupabaseAuthProvider {
    pub fn new(supabase_url: &str, supabase_publishable_key: &str) -> Self {
        Self {
            http_client: Client::new(),
            supabase_url: supabase_url.trim_end_matches('/').to_string(),
            supabase_publishable_key: supabase_publishable_key.to_string(),
        }
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.supabase_url, path)
    }

    async fn error_from(response: Response) -> AuthError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(status = %status, body = %body, "Supabase auth request rejected");
        map_error_response(status.as_u16(), &body)
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuthProvider {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let url = self.auth_url("token?grant_type=password");
        debug!(url = %url, email = %email, "Attempting email/password sign-in");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.supabase_publishable_key)
            .json(&PasswordRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        let data: SessionResponse = response.json().await?;
        let identity = data.into_identity();
        info!(user_id = %identity.user_id, "Sign-in successful");
        Ok(identity)
    }

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity> {
        let url = self.auth_url("signup");
        debug!(url = %url, email = %email, "Attempting sign-up");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.supabase_publishable_key)
            .json(&PasswordRequest { email, password })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        match response.json::<SignUpResponse>().await? {
            SignUpResponse::Session(data) => {
                let identity = data.into_identity();
                info!(user_id = %identity.user_id, "Sign-up successful");
                Ok(identity)
            }
            SignUpResponse::User(user) => {
                info!(user_id = %user.id, "Sign-up pending email confirmation");
                Err(AuthError::ConfirmationRequired)
            }
        }
    }

    async fn sign_out(&self, identity: &Identity) -> AuthResult<()> {
        let Some(access_token) = identity.access_token() else {
            return Ok(());
        };

        let response = self
            .http_client
            .post(self.auth_url("logout"))
            .header("apikey", &self.supabase_publishable_key)
            .header("Authorization", format!("Bearer {}", access_token))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from(response).await);
        }

        info!(user_id = %identity.user_id, "Session revoked");
        Ok(())
    }

    async fn refresh(&self, identity: &Identity) -> AuthResult<Identity> {
        let refresh_token = identity
            .credentials
            .as_ref()
            .map(|c| c.refresh_token.as_str())
            .ok_or(AuthError::NotLoggedIn)?;

        let url = self.auth_url("token?grant_type=refresh_token");
        debug!(url = %url, "Refreshing token");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.supabase_publishable_key)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;

        if !response.status().is_success() {
            let err = Self::error_from(response).await;
            return Err(match err {
                AuthError::Provider { status, .. } if status >= 500 => err,
                other => AuthError::TokenRefresh(other.to_string()),
            });
        }

        let data: SessionResponse = response.json().await?;
        let identity = data.into_identity();
        info!(user_id = %identity.user_id, "Token refreshed successfully");
        Ok(identity)
    }
}
