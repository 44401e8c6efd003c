// Admission Result Descriptors (wire shapes are camelCase)

use crate::domain::entry::{AdmissionState, UserId};
use serde::{Deserialize, Serialize};

/// Projected admission delay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitEstimate {
    pub seconds: u64,
    pub minutes: u64,
    pub formatted: String,
}

impl WaitEstimate {
    pub fn zero() -> Self {
        Self {
            seconds: 0,
            minutes: 0,
            formatted: "0 seconds".to_string(),
        }
    }
}

/// Per-user status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusDescriptor {
    pub status: AdmissionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_in_queue: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_users: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_wait_time: Option<WaitEstimate>,
    pub can_access: bool,
}

impl StatusDescriptor {
    pub fn not_in_queue() -> Self {
        Self {
            status: AdmissionState::NotInQueue,
            position: None,
            total_in_queue: None,
            active_users: None,
            estimated_wait_time: None,
            can_access: false,
        }
    }

    pub fn active() -> Self {
        Self {
            status: AdmissionState::Active,
            can_access: true,
            ..Self::not_in_queue()
        }
    }

    pub fn waiting(
        position: u64,
        total_in_queue: u64,
        active_users: u64,
        estimated_wait_time: WaitEstimate,
    ) -> Self {
        Self {
            status: AdmissionState::Waiting,
            position: Some(position),
            total_in_queue: Some(total_in_queue),
            active_users: Some(active_users),
            estimated_wait_time: Some(estimated_wait_time),
            can_access: false,
        }
    }
}

/// Freshly created waiting entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinedEntry {
    pub user_id: UserId,
    pub queue_token: String,
    pub position: u64,
    pub estimated_wait_time: WaitEstimate,
}

/// Result of enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Already admitted, nothing written
    Active { user_id: UserId },
    /// Already waiting, nothing written
    Waiting(StatusDescriptor),
    /// New entry persisted
    Joined(JoinedEntry),
}

/// Result of dequeue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DequeueResult {
    pub removed: bool,
    pub message: String,
}

/// One row of the leading window of the waiting structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedUser {
    pub user_id: UserId,
    pub position: u64,
    pub joined_at: String, // RFC 3339
    pub estimated_wait_time: WaitEstimate,
}

/// Aggregate queue descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueInfo {
    pub queue_length: u64,
    pub active_users: u64,
    pub max_concurrent_users: u32,
    pub available_slots: u64,
    pub next_in_queue: Vec<QueuedUser>,
}

/// Result of clear
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearResult {
    pub message: String,
}
