// Waiting Room Service - the admission API surface

use crate::application::scheduler::constants::{REASON_DISCONNECT, REASON_JOIN, REASON_LEAVE};
use crate::application::{AdmissionController, PromotionScheduler, SweepReport};
use crate::domain::{
    AdmissionState, Audience, ClearResult, DequeueResult, EnqueueOutcome, EntryAttrs, QueueEvent,
    QueueInfo, StatusDescriptor, UserId, WaitEstimate,
};
use crate::error::{AppError, Result};
use crate::port::{Notifier, TimeProvider, TokenIssuer};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Join request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(alias = "userId")]
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
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

/// Join response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinResponse {
    pub status: AdmissionState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_wait_time: Option<WaitEstimate>,
    pub can_access: bool,
}

impl JoinResponse {
    fn active(user_id: &str, access_token: String, queue_token: Option<String>) -> Self {
        Self {
            status: AdmissionState::Active,
            user_id: Some(user_id.to_string()),
            position: None,
            queue_token,
            access_token: Some(access_token),
            estimated_wait_time: None,
            can_access: true,
        }
    }

    fn from_status(
        user_id: &str,
        status: StatusDescriptor,
        queue_token: Option<String>,
    ) -> Self {
        Self {
            status: status.status,
            user_id: Some(user_id.to_string()),
            position: status.position,
            queue_token,
            access_token: None,
            estimated_wait_time: status.estimated_wait_time,
            can_access: status.can_access,
        }
    }
}

/// Access verification result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub valid: bool,
    pub user_id: UserId,
    pub status: AdmissionState,
}

/// Waiting room service
///
/// Composes the controller, the scheduler and the collaborators; transport
/// handlers call only this type.
pub struct WaitingRoomService {
    controller: Arc<AdmissionController>,
    scheduler: Arc<PromotionScheduler>,
    token_issuer: Arc<dyn TokenIssuer>,
    notifier: Arc<dyn Notifier>,
    time_provider: Arc<dyn TimeProvider>,
}

impl WaitingRoomService {
    pub fn new(
        controller: Arc<AdmissionController>,
        scheduler: Arc<PromotionScheduler>,
        token_issuer: Arc<dyn TokenIssuer>,
        notifier: Arc<dyn Notifier>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            controller,
            scheduler,
            token_issuer,
            notifier,
            time_provider,
        }
    }

    pub fn scheduler(&self) -> &Arc<PromotionScheduler> {
        &self.scheduler
    }

    /// Join the queue (or report the state the user is already in)
    pub async fn join(&self, req: JoinRequest) -> Result<JoinResponse> {
        let attrs = EntryAttrs {
            email: req.email,
            metadata: req.metadata,
        };

        match self.controller.enqueue(&req.user_id, attrs).await? {
            EnqueueOutcome::Active { user_id } => {
                let token = self.token_issuer.issue_access_token(&user_id).await?;
                Ok(JoinResponse::active(&user_id, token, None))
            }
            EnqueueOutcome::Waiting(status) => {
                Ok(JoinResponse::from_status(&req.user_id, status, None))
            }
            EnqueueOutcome::Joined(entry) => {
                self.notifier.publish(
                    Audience::User(entry.user_id.clone()),
                    QueueEvent::QueueJoined {
                        user_id: entry.user_id.clone(),
                        queue_token: entry.queue_token.clone(),
                        position: entry.position,
                        estimated_wait_time: entry.estimated_wait_time.clone(),
                    },
                );

                // The entry is committed; a failed sweep only delays admission
                let report = match self.scheduler.trigger(REASON_JOIN).await {
                    Ok(report) => report,
                    Err(e) => {
                        warn!(user_id = %entry.user_id, error = %e, "Sweep after join failed");
                        SweepReport::default()
                    }
                };
                if let Some(token) = report.access_token_for(&entry.user_id) {
                    return Ok(JoinResponse::active(
                        &entry.user_id,
                        token.to_string(),
                        Some(entry.queue_token),
                    ));
                }

                // A concurrent sweep or leave may have moved us since the insert
                let status = self.controller.status(&entry.user_id).await?;
                match status.status {
                    AdmissionState::Active => {
                        let token = self.token_issuer.issue_access_token(&entry.user_id).await?;
                        Ok(JoinResponse::active(
                            &entry.user_id,
                            token,
                            Some(entry.queue_token),
                        ))
                    }
                    AdmissionState::Waiting | AdmissionState::NotInQueue => Ok(
                        JoinResponse::from_status(&entry.user_id, status, Some(entry.queue_token)),
                    ),
                }
            }
        }
    }

    /// Leave the queue (idempotent)
    pub async fn leave(&self, user_id: &str) -> Result<DequeueResult> {
        let result = self.controller.dequeue(user_id).await?;

        self.notifier.publish(
            Audience::User(user_id.to_string()),
            QueueEvent::QueueLeft {
                message: "You have left the queue".to_string(),
                timestamp: self.time_provider.now_rfc3339(),
            },
        );

        // The dequeue is committed; report it even if the follow-up sweep fails
        if let Err(e) = self.scheduler.trigger(REASON_LEAVE).await {
            warn!(user_id, error = %e, "Sweep after leave failed");
        }
        Ok(result)
    }

    pub async fn status(&self, user_id: &str) -> Result<StatusDescriptor> {
        self.controller.status(user_id).await
    }

    /// Resolve an access token and report whether its user is still active
    pub async fn verify(&self, access_token: &str) -> Result<VerifyResponse> {
        if access_token.trim().is_empty() {
            return Err(AppError::Unauthorized("Access token required".to_string()));
        }

        let user_id = self
            .token_issuer
            .resolve(access_token)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))?;

        let status = self.controller.status(&user_id).await?;
        Ok(VerifyResponse {
            valid: status.status == AdmissionState::Active,
            user_id,
            status: status.status,
        })
    }

    pub async fn info(&self) -> Result<QueueInfo> {
        self.controller.queue_info().await
    }

    /// Reset all state and tell every connected client
    pub async fn clear(&self) -> Result<ClearResult> {
        let result = self.controller.clear().await?;
        self.notifier.publish(
            Audience::All,
            QueueEvent::QueueCleared {
                message: "Queue has been cleared".to_string(),
            },
        );
        info!("Queue cleared by admin request");
        Ok(result)
    }

    /// A real-time subscriber went away; membership is kept, capacity is re-checked
    pub async fn disconnected(&self, user_id: &str) -> Result<()> {
        debug!(user_id, "Subscriber disconnected");
        self.scheduler.trigger(REASON_DISCONNECT).await?;
        Ok(())
    }
}
