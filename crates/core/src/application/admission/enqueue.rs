// Enqueue Use Case

use super::AdmissionController;
use crate::domain::{AdmissionState, EnqueueOutcome, EntryAttrs, JoinedEntry, QueueEntry};
use crate::error::Result;
use crate::port::InsertOutcome;
use tracing::{debug, info};

/// Execute enqueue (user id already validated)
///
/// The entry record and ordered membership are written by one atomic store
/// call; if the store finds the user already waiting or active it reports
/// that instead of writing, so concurrent joins for one id stay idempotent.
pub async fn execute(
    controller: &AdmissionController,
    user_id: &str,
    attrs: EntryAttrs,
) -> Result<EnqueueOutcome> {
    let store = controller.store.as_ref();

    if store.is_active(user_id).await? {
        debug!(user_id, "Enqueue skipped, user already active");
        return Ok(EnqueueOutcome::Active {
            user_id: user_id.to_string(),
        });
    }
    if let Some(rank) = store.waiting_rank(user_id).await? {
        debug!(user_id, rank, "Enqueue skipped, user already waiting");
        return Ok(EnqueueOutcome::Waiting(controller.waiting_status(rank).await?));
    }

    // Injected id and timestamp for determinism
    let queue_token = controller.id_provider.generate_id();
    let arrived_at = controller.time_provider.now_millis();
    let entry = QueueEntry::new(
        user_id,
        queue_token,
        arrived_at,
        controller.capacity.ttl_millis(),
        attrs,
    );

    match store.insert_waiting(&entry).await? {
        InsertOutcome::Inserted { rank } => {
            let state = AdmissionState::NotInQueue.transition(AdmissionState::Waiting)?;
            let position = rank + 1;
            info!(user_id, position, %state, "User joined the queue");

            Ok(EnqueueOutcome::Joined(JoinedEntry {
                user_id: entry.user_id,
                queue_token: entry.queue_token,
                position,
                estimated_wait_time: controller.estimator.estimate(position),
            }))
        }
        InsertOutcome::AlreadyWaiting { rank } => {
            Ok(EnqueueOutcome::Waiting(controller.waiting_status(rank).await?))
        }
        InsertOutcome::AlreadyActive => Ok(EnqueueOutcome::Active {
            user_id: entry.user_id,
        }),
    }
}
