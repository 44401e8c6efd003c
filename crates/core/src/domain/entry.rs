// Waiting Entry & Active Membership Domain Model

use serde::{Deserialize, Serialize};

/// Caller-supplied opaque user identity
pub type UserId = String;

/// Admission state of a user identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionState {
    NotInQueue,
    Waiting,
    Active,
}

impl std::fmt::Display for AdmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdmissionState::NotInQueue => write!(f, "not_in_queue"),
            AdmissionState::Waiting => write!(f, "waiting"),
            AdmissionState::Active => write!(f, "active"),
        }
    }
}

impl AdmissionState {
    /// Validate a state transition
    ///
    /// NotInQueue -> Waiting (enqueue), Waiting -> Active (promote),
    /// Waiting | Active -> NotInQueue (leave or expiry).
    pub fn transition(self, to: AdmissionState) -> crate::domain::error::Result<AdmissionState> {
        use AdmissionState::*;
        match (self, to) {
            (NotInQueue, Waiting) | (Waiting, Active) | (Waiting, NotInQueue) | (Active, NotInQueue) => {
                Ok(to)
            }
            _ => Err(crate::domain::error::DomainError::InvalidStateTransition {
                from: self.to_string(),
                to: to.to_string(),
            }),
        }
    }
}

/// Optional attributes supplied on join, stored verbatim
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryAttrs {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Waiting entry (one per queued user identity)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub user_id: UserId,
    pub queue_token: String,

    pub arrived_at: i64, // epoch ms, primary ordering key
    pub expires_at: i64, // epoch ms

    pub email: Option<String>,
    pub metadata: serde_json::Value,
}

impl QueueEntry {
    /// Create a new waiting entry
    ///
    /// # Arguments
    ///
    /// * `user_id` - Caller-supplied identity
    /// * `queue_token` - Correlation token (injected, not generated)
    /// * `arrived_at` - Arrival timestamp in epoch ms (injected, not system time)
    /// * `ttl_ms` - Time-to-live of the entry
    /// * `attrs` - Optional caller attributes
    pub fn new(
        user_id: impl Into<String>,
        queue_token: impl Into<String>,
        arrived_at: i64,
        ttl_ms: i64,
        attrs: EntryAttrs,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            queue_token: queue_token.into(),
            arrived_at,
            expires_at: arrived_at + ttl_ms,
            email: attrs.email.filter(|e| !e.is_empty()),
            metadata: attrs.metadata.unwrap_or_else(|| serde_json::json!({})),
        }
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at <= now_millis
    }
}

/// Admitted user identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMembership {
    pub user_id: UserId,
    pub admitted_at: i64,
    pub expires_at: i64,
}

impl ActiveMembership {
    pub fn new(user_id: impl Into<String>, admitted_at: i64, ttl_ms: i64) -> Self {
        Self {
            user_id: user_id.into(),
            admitted_at,
            expires_at: admitted_at + ttl_ms,
        }
    }

    pub fn is_expired(&self, now_millis: i64) -> bool {
        self.expires_at <= now_millis
    }
}

/// Ordered waiting slot as returned by a range read (no entry attributes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingSlot {
    pub user_id: UserId,
    pub arrived_at: i64,
}

/// Reject empty, whitespace-only, or untrimmed identities before touching any store
pub fn validate_user_id(user_id: &str) -> crate::domain::error::Result<()> {
    if user_id.trim().is_empty() {
        return Err(crate::domain::error::DomainError::ValidationError(
            "userId is required".to_string(),
        ));
    }
    if user_id.trim() != user_id {
        return Err(crate::domain::error::DomainError::ValidationError(
            "userId must not have leading or trailing whitespace".to_string(),
        ));
    }
    Ok(())
}
