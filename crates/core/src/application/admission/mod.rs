// Admission Controller - Core use cases for queue membership

pub mod enqueue;
pub mod promote;


use crate::application::WaitEstimator;
use crate::domain::{
    validate_user_id, Capacity, ClearResult, DequeueResult, DomainError, EnqueueOutcome,
    EntryAttrs, QueueInfo, QueuedUser, StatusDescriptor, UserId,
};
use crate::error::{AppError, Result};
use crate::port::time_provider::millis_to_rfc3339;
use crate::port::{AdmissionStore, IdProvider, TimeProvider};
use std::sync::Arc;
use tracing::info;

/// Leading window of the waiting structure reported by `queue_info`
pub const NEXT_IN_QUEUE_WINDOW: usize = 10;

/// Admission Controller
///
/// Stateless over the store: every call is a fresh sequence of store
/// round-trips, so any number of callers may share one controller.
pub struct AdmissionController {
    store: Arc<dyn AdmissionStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    capacity: Capacity,
    estimator: WaitEstimator,
}

impl AdmissionController {
    pub fn new(
        store: Arc<dyn AdmissionStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        capacity: Capacity,
    ) -> Self {
        let estimator = WaitEstimator::new(&capacity);
        Self {
            store,
            id_provider,
            time_provider,
            capacity,
            estimator,
        }
    }

    pub fn capacity(&self) -> &Capacity {
        &self.capacity
    }

    /// Add a user to the waiting structure (idempotent)
    pub async fn enqueue(&self, user_id: &str, attrs: EntryAttrs) -> Result<EnqueueOutcome> {
        require_user_id(user_id)?;
        enqueue::execute(self, user_id, attrs).await
    }

    /// Remove a user from waiting and active membership (idempotent)
    pub async fn dequeue(&self, user_id: &str) -> Result<DequeueResult> {
        require_user_id(user_id)?;

        let removal = self.store.remove_user(user_id).await?;
        if removal.any() {
            info!(
                user_id,
                was_waiting = removal.waiting,
                was_active = removal.active,
                "User left the queue"
            );
            Ok(DequeueResult {
                removed: true,
                message: "Successfully left the queue".to_string(),
            })
        } else {
            Ok(DequeueResult {
                removed: false,
                message: "User not found in queue".to_string(),
            })
        }
    }

    /// Move the earliest waiting users into free active slots
    ///
    /// Returns promoted ids in promotion order.
    pub async fn promote(&self) -> Result<Vec<UserId>> {
        promote::execute(self).await
    }

    pub async fn status(&self, user_id: &str) -> Result<StatusDescriptor> {
        require_user_id(user_id)?;

        if self.store.is_active(user_id).await? {
            return Ok(StatusDescriptor::active());
        }
        match self.store.waiting_rank(user_id).await? {
            Some(rank) => self.waiting_status(rank).await,
            None => Ok(StatusDescriptor::not_in_queue()),
        }
    }

    pub async fn queue_info(&self) -> Result<QueueInfo> {
        let queue_length = self.store.waiting_count().await?;
        let active_users = self.store.active_count().await?;
        let head = self.store.peek_waiting(NEXT_IN_QUEUE_WINDOW).await?;

        let next_in_queue = head
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                let position = index as u64 + 1;
                QueuedUser {
                    user_id: slot.user_id,
                    position,
                    joined_at: millis_to_rfc3339(slot.arrived_at),
                    estimated_wait_time: self.estimator.estimate(position),
                }
            })
            .collect();

        let max = u64::from(self.capacity.max_concurrent_users);
        Ok(QueueInfo {
            queue_length,
            active_users,
            max_concurrent_users: self.capacity.max_concurrent_users,
            available_slots: max.saturating_sub(active_users),
            next_in_queue,
        })
    }

    /// Delete all waiting entries, memberships and entry records (best-effort)
    pub async fn clear(&self) -> Result<ClearResult> {
        self.store.clear().await?;
        info!("Queue cleared");
        Ok(ClearResult {
            message: "Queue cleared successfully".to_string(),
        })
    }

    /// Waiting descriptor for a 0-based rank
    pub(crate) async fn waiting_status(&self, rank: u64) -> Result<StatusDescriptor> {
        let position = rank + 1;
        let total_in_queue = self.store.waiting_count().await?;
        let active_users = self.store.active_count().await?;
        Ok(StatusDescriptor::waiting(
            position,
            total_in_queue,
            active_users,
            self.estimator.estimate(position),
        ))
    }
}

/// Validation happens before any store access
fn require_user_id(user_id: &str) -> Result<()> {
    validate_user_id(user_id).map_err(|e| match e {
        DomainError::ValidationError(msg) => AppError::Validation(msg),
        other => AppError::Domain(other),
    })
}
