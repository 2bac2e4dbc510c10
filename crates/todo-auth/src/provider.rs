use crate::{AuthResult, Identity};
use async_trait::async_trait;

/// A remote identity service.
///
/// Every returned [`Identity`] carries credentials; `refresh` trades the
/// refresh token for a fresh pair.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Identity>;

    async fn sign_up(&self, email: &str, password: &str) -> AuthResult<Identity>;

    /// Revoke the session server-side.
    async fn sign_out(&self, identity: &Identity) -> AuthResult<()>;

    async fn refresh(&self, identity: &Identity) -> AuthResult<Identity>;
}
