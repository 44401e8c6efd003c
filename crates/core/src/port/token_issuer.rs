// Token Issuer Port (Interface)

use crate::domain::UserId;
use crate::error::Result;
use async_trait::async_trait;

/// Collaborator that issues and resolves access credentials
///
/// Failures surface as `AppError::Collaborator`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issue an access token bound to `user_id`
    async fn issue_access_token(&self, user_id: &str) -> Result<String>;

    /// Resolve a presented token to its user identity (None if unknown or expired)
    async fn resolve(&self, token: &str) -> Result<Option<UserId>>;
}
