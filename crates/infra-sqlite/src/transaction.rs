// SQLite Promotion Transaction

use crate::admission_store::{delete_waiting, head_of_queue, live_active_count, purge_expired};
use crate::map_sqlx_error;
use async_trait::async_trait;
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use std::sync::Arc;
use waitroom_core::domain::{ActiveMembership, WaitingSlot};
use waitroom_core::error::Result;
use waitroom_core::port::{PromotionTransaction, TimeProvider, Transaction};

/// Promotion step over a transaction that already holds the write lock
///
/// Dropping it without commit rolls back.
pub struct SqlitePromotion {
    tx: SqlxTransaction<'static, Sqlite>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqlitePromotion {
    pub fn new(tx: SqlxTransaction<'static, Sqlite>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { tx, time_provider }
    }
}

#[async_trait]
impl Transaction for SqlitePromotion {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)?;
        Ok(())
    }
}

#[async_trait]
impl PromotionTransaction for SqlitePromotion {
    async fn active_count(&mut self) -> Result<u64> {
        let now = self.time_provider.now_millis();
        purge_expired(&mut self.tx, now).await?;
        live_active_count(&mut self.tx, now).await
    }

    async fn pop_earliest(&mut self, limit: u64) -> Result<Vec<WaitingSlot>> {
        let now = self.time_provider.now_millis();
        let slots = head_of_queue(&mut self.tx, limit as i64, now).await?;
        for slot in &slots {
            delete_waiting(&mut self.tx, &slot.user_id).await?;
        }
        Ok(slots)
    }

    async fn admit(&mut self, membership: &ActiveMembership) -> Result<()> {
        sqlx::query(
            "INSERT OR REPLACE INTO active (user_id, admitted_at, expires_at) VALUES (?, ?, ?)",
        )
        .bind(&membership.user_id)
        .bind(membership.admitted_at)
        .bind(membership.expires_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }
}
