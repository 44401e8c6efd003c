// Transaction port for atomic promotion

use crate::domain::{ActiveMembership, WaitingSlot};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
///
/// Dropping an uncommitted transaction rolls it back.
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Promotion step executed as one serialized unit
///
/// Implementations must exclude every other promotion transaction (and every
/// write to the waiting/active structures) between `begin_promotion` and
/// commit, so the capacity read stays valid until the admits are committed.
#[async_trait]
pub trait PromotionTransaction: Transaction {
    /// Live (unexpired) active members
    async fn active_count(&mut self) -> Result<u64>;

    /// Remove up to `limit` earliest live waiting entries (and their records)
    async fn pop_earliest(&mut self, limit: u64) -> Result<Vec<WaitingSlot>>;

    /// Insert into active membership
    async fn admit(&mut self, membership: &ActiveMembership) -> Result<()>;
}
