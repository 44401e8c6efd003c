//! RPC Method Handlers
//!
//! Thin adapters from JSON-RPC params to the waiting room service.

use crate::error::to_rpc_error;
use crate::types::{JoinParams, UserParams, VerifyParams};
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::warn;
use waitroom_core::application::{JoinResponse, VerifyResponse, WaitingRoomService};
use waitroom_core::domain::{
    AdmissionState, ClearResult, DequeueResult, QueueInfo, StatusDescriptor,
};
use waitroom_core::error::AppError;

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    service: Arc<WaitingRoomService>,
}

impl RpcHandler {
    pub fn new(service: Arc<WaitingRoomService>) -> Self {
        Self { service }
    }

    /// queue.join.v1
    pub async fn join(&self, params: JoinParams) -> Result<JoinResponse, ErrorObjectOwned> {
        self.service
            .join(params.into())
            .await
            .map_err(to_rpc_error)
    }

    /// queue.leave.v1
    pub async fn leave(&self, params: UserParams) -> Result<DequeueResult, ErrorObjectOwned> {
        self.service
            .leave(&params.user_id)
            .await
            .map_err(to_rpc_error)
    }

    /// queue.status.v1 (`not_in_queue` is reported as NOT_FOUND)
    pub async fn status(&self, params: UserParams) -> Result<StatusDescriptor, ErrorObjectOwned> {
        let status = self
            .service
            .status(&params.user_id)
            .await
            .map_err(to_rpc_error)?;

        if status.status == AdmissionState::NotInQueue {
            return Err(to_rpc_error(AppError::NotFound(
                "User not found in queue".to_string(),
            )));
        }
        Ok(status)
    }

    /// queue.verify.v1
    pub async fn verify(&self, params: VerifyParams) -> Result<VerifyResponse, ErrorObjectOwned> {
        self.service
            .verify(&params.access_token)
            .await
            .map_err(to_rpc_error)
    }

    /// admin.info.v1
    pub async fn info(&self) -> Result<QueueInfo, ErrorObjectOwned> {
        self.service.info().await.map_err(to_rpc_error)
    }

    /// admin.clear.v1
    pub async fn clear(&self) -> Result<ClearResult, ErrorObjectOwned> {
        self.service.clear().await.map_err(to_rpc_error)
    }

    /// Subscription closed (unsubscribe or connection drop)
    pub async fn disconnected(&self, user_id: &str) {
        if let Err(e) = self.service.disconnected(user_id).await {
            warn!(user_id, error = %e, "Sweep after disconnect failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::code;
    use crate::BroadcastNotifier;
    use async_trait::async_trait;
    use waitroom_core::application::{AdmissionController, PromotionScheduler};
    use waitroom_core::domain::{Capacity, UserId};
    use waitroom_core::port::admission_store::memory::InMemoryAdmissionStore;
    use waitroom_core::port::id_provider::mocks::SequentialIdProvider;
    use waitroom_core::port::time_provider::mocks::ManualClock;
    use waitroom_core::port::TokenIssuer;

    struct EchoIssuer;

    #[async_trait]
    impl TokenIssuer for EchoIssuer {
        async fn issue_access_token(&self, user_id: &str) -> waitroom_core::Result<String> {
            Ok(format!("access-{}", user_id))
        }

        async fn resolve(&self, token: &str) -> waitroom_core::Result<Option<UserId>> {
            Ok(token.strip_prefix("access-").map(str::to_string))
        }
    }

    fn handler(max: u32) -> RpcHandler {
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let issuer: Arc<dyn TokenIssuer> = Arc::new(EchoIssuer);
        let notifier = Arc::new(BroadcastNotifier::default());
        let controller = Arc::new(AdmissionController::new(
            Arc::new(InMemoryAdmissionStore::new(clock.clone())),
            Arc::new(SequentialIdProvider::new("qt")),
            clock.clone(),
            Capacity::new(max, 30, 180, 5).unwrap(),
        ));
        let scheduler = Arc::new(PromotionScheduler::new(
            controller.clone(),
            issuer.clone(),
            notifier.clone(),
            clock.clone(),
        ));
        RpcHandler::new(Arc::new(WaitingRoomService::new(
            controller, scheduler, issuer, notifier, clock,
        )))
    }

    fn user(id: &str) -> UserParams {
        UserParams {
            user_id: id.to_string(),
        }
    }

    #[tokio::test]
    async fn test_status_not_in_queue_is_not_found() {
        let handler = handler(1);
        let err = handler.status(user("ghost")).await.unwrap_err();
        assert_eq!(err.code(), code::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_join_then_status() {
        let handler = handler(1);
        let join = |id: &str| JoinParams {
            user_id: id.to_string(),
            email: None,
            metadata: None,
        };

        let a = handler.join(join("a")).await.unwrap();
        assert_eq!(a.status, AdmissionState::Active);
        let b = handler.join(join("b")).await.unwrap();
        assert_eq!(b.status, AdmissionState::Waiting);

        let status = handler.status(user("b")).await.unwrap();
        assert_eq!(status.position, Some(1));
        assert_eq!(status.active_users, Some(1));
    }

    #[tokio::test]
    async fn test_validation_and_auth_codes() {
        let handler = handler(1);

        let err = handler.leave(user("")).await.unwrap_err();
        assert_eq!(err.code(), code::VALIDATION_ERROR);

        let err = handler
            .verify(VerifyParams {
                access_token: "nope".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), code::UNAUTHORIZED);
    }
}
