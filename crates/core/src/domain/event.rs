// Outbound Notification Events

use crate::domain::descriptor::WaitEstimate;
use crate::domain::entry::{AdmissionState, UserId};
use serde::{Deserialize, Serialize};

/// Who a notification is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    User(UserId),
    All,
}

impl Audience {
    pub fn includes(&self, user_id: &str) -> bool {
        match self {
            Audience::User(id) => id == user_id,
            Audience::All => true,
        }
    }
}

/// Event pushed to the real-time transport (fixed payload shapes)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum QueueEvent {
    #[serde(rename = "queue-joined", rename_all = "camelCase")]
    QueueJoined {
        user_id: UserId,
        queue_token: String,
        position: u64,
        estimated_wait_time: WaitEstimate,
    },
    #[serde(rename = "queue-ready", rename_all = "camelCase")]
    QueueReady {
        status: AdmissionState,
        access_token: String,
        message: String,
        timestamp: String,
    },
    #[serde(rename = "queue-update", rename_all = "camelCase")]
    QueueUpdate {
        position: u64,
        estimated_wait_time: WaitEstimate,
        timestamp: String,
    },
    #[serde(rename = "queue-left")]
    QueueLeft { message: String, timestamp: String },
    #[serde(rename = "queue-cleared")]
    QueueCleared { message: String },
}

impl QueueEvent {
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::QueueJoined { .. } => "queue-joined",
            QueueEvent::QueueReady { .. } => "queue-ready",
            QueueEvent::QueueUpdate { .. } => "queue-update",
            QueueEvent::QueueLeft { .. } => "queue-left",
            QueueEvent::QueueCleared { .. } => "queue-cleared",
        }
    }

    pub fn ready(access_token: impl Into<String>, timestamp: impl Into<String>) -> Self {
        QueueEvent::QueueReady {
            status: AdmissionState::Active,
            access_token: access_token.into(),
            message: "You can now access the service".to_string(),
            timestamp: timestamp.into(),
        }
    }
}
