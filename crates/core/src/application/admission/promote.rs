// Promotion Use Case

use super::AdmissionController;
use crate::domain::{ActiveMembership, AdmissionState, UserId};
use crate::error::Result;
use tracing::{debug, info};

/// Execute one promotion step (with transaction for atomicity)
///
/// The capacity read, the bounded pop and the admits all happen inside one
/// store transaction; the store serializes these transactions, so
/// overlapping promotions cannot jointly exceed capacity.
pub async fn execute(controller: &AdmissionController) -> Result<Vec<UserId>> {
    let mut tx = controller.store.begin_promotion().await?;

    let active = tx.active_count().await?;
    let max = u64::from(controller.capacity.max_concurrent_users);
    if active >= max {
        tx.rollback().await?;
        debug!(active, max, "No free slots");
        return Ok(Vec::new());
    }

    let slots = tx.pop_earliest(max - active).await?;
    if slots.is_empty() {
        tx.rollback().await?;
        return Ok(Vec::new());
    }

    let admitted_at = controller.time_provider.now_millis();
    let ttl = controller.capacity.ttl_millis();
    let mut promoted = Vec::with_capacity(slots.len());

    for slot in slots {
        let state = AdmissionState::Waiting.transition(AdmissionState::Active)?;
        tx.admit(&ActiveMembership::new(slot.user_id.clone(), admitted_at, ttl))
            .await?;
        debug!(user_id = %slot.user_id, %state, "Admitted");
        promoted.push(slot.user_id);
    }

    tx.commit().await?;

    info!(count = promoted.len(), active_before = active, "Promoted users");
    Ok(promoted)
}
