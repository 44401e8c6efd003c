//! SDK Request/Response Types
//!
//! Mirrors the daemon's wire shapes (camelCase results).

use serde::{Deserialize, Serialize};

/// Request to join the waiting room
#[derive(Debug, Clone, Default, Serialize)]
pub struct JoinRequest {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl JoinRequest {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }
}

/// Projected admission delay
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WaitEstimate {
    pub seconds: u64,
    pub minutes: u64,
    pub formatted: String,
}

/// Response from join
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    /// "waiting" or "active"
    pub status: String,
    pub user_id: Option<String>,
    pub position: Option<u64>,
    pub queue_token: Option<String>,
    pub access_token: Option<String>,
    pub estimated_wait_time: Option<WaitEstimate>,
    pub can_access: bool,
}

/// Response from leave
#[derive(Debug, Clone, Deserialize)]
pub struct LeaveResponse {
    pub removed: bool,
    pub message: String,
}

/// Per-user status
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: String,
    pub position: Option<u64>,
    pub total_in_queue: Option<u64>,
    pub active_users: Option<u64>,
    pub estimated_wait_time: Option<WaitEstimate>,
    pub can_access: bool,
}

/// Response from verify
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub user_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedUser {
    pub user_id: String,
    pub position: u64,
    pub joined_at: String,
    pub estimated_wait_time: WaitEstimate,
}

/// Aggregate queue info
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueInfo {
    pub queue_length: u64,
    pub active_users: u64,
    pub max_concurrent_users: u32,
    pub available_slots: u64,
    pub next_in_queue: Vec<QueuedUser>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearResponse {
    pub message: String,
}

/// Real-time event delivered on a subscription
///
/// `event` is one of queue-joined, queue-ready, queue-update, queue-left,
/// queue-cleared. The payload shape depends on it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueueEventMessage {
    pub event: String,
    pub payload: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_join_request_omits_empty_attrs() {
        let json = serde_json::to_value(JoinRequest::new("alice")).unwrap();
        assert_eq!(json, json!({"user_id": "alice"}));
    }

    #[test]
    fn test_status_response_from_wire() {
        let status: StatusResponse = serde_json::from_value(json!({
            "status": "waiting",
            "position": 2,
            "totalInQueue": 4,
            "activeUsers": 2,
            "estimatedWaitTime": {"seconds": 180, "minutes": 3, "formatted": "3 minutes"},
            "canAccess": false
        }))
        .unwrap();
        assert_eq!(status.position, Some(2));
        assert_eq!(status.estimated_wait_time.unwrap().formatted, "3 minutes");

        let active: StatusResponse =
            serde_json::from_value(json!({"status": "active", "canAccess": true})).unwrap();
        assert!(active.can_access);
        assert!(active.position.is_none());
    }
}
