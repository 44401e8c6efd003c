// Opaque Token Issuer
// Random bearer tokens held in process memory; no signing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;
use waitroom_core::domain::UserId;
use waitroom_core::error::{AppError, Result};
use waitroom_core::port::{TimeProvider, TokenIssuer};

pub const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;

const TOKEN_PREFIX: &str = "wr_";

struct Grant {
    user_id: UserId,
    expires_at: i64,
}

/// Issues `wr_<uuid>` tokens and resolves them until they expire
pub struct OpaqueTokenIssuer {
    grants: RwLock<HashMap<String, Grant>>,
    time_provider: Arc<dyn TimeProvider>,
    ttl_millis: i64,
}

impl OpaqueTokenIssuer {
    pub fn new(time_provider: Arc<dyn TimeProvider>, ttl_hours: u64) -> Result<Self> {
        if ttl_hours == 0 {
            return Err(AppError::Config(
                "token.ttl_hours must be > 0".to_string(),
            ));
        }
        Ok(Self {
            grants: RwLock::new(HashMap::new()),
            time_provider,
            ttl_millis: ttl_hours as i64 * 60 * 60 * 1000,
        })
    }

    /// Live grants (expired ones are dropped on the next issue)
    pub async fn len(&self) -> usize {
        let now = self.time_provider.now_millis();
        self.grants
            .read()
            .await
            .values()
            .filter(|g| g.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TokenIssuer for OpaqueTokenIssuer {
    async fn issue_access_token(&self, user_id: &str) -> Result<String> {
        if user_id.trim().is_empty() {
            return Err(AppError::Collaborator(
                "cannot issue a token without a user id".to_string(),
            ));
        }

        let now = self.time_provider.now_millis();
        let token = format!("{}{}", TOKEN_PREFIX, uuid::Uuid::new_v4().simple());

        let mut grants = self.grants.write().await;
        grants.retain(|_, g| g.expires_at > now);
        grants.insert(
            token.clone(),
            Grant {
                user_id: user_id.to_string(),
                expires_at: now + self.ttl_millis,
            },
        );

        debug!(user_id, live_grants = grants.len(), "Access token issued");
        Ok(token)
    }

    async fn resolve(&self, token: &str) -> Result<Option<UserId>> {
        if !token.starts_with(TOKEN_PREFIX) {
            return Ok(None);
        }
        let now = self.time_provider.now_millis();
        let grants = self.grants.read().await;
        Ok(grants
            .get(token)
            .filter(|g| g.expires_at > now)
            .map(|g| g.user_id.clone()))
    }
}
