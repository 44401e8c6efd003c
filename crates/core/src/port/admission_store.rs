// Admission Store Port (Interface)
// Ordered waiting structure + active membership + per-user entry records

use crate::domain::{QueueEntry, WaitingSlot};
use crate::error::Result;
use crate::port::PromotionTransaction;
use async_trait::async_trait;

/// Outcome of the atomic enqueue write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Entry and ordered membership written; 0-based rank
    Inserted { rank: u64 },
    /// A live waiting entry already existed; nothing written
    AlreadyWaiting { rank: u64 },
    /// The user is an active member; nothing written
    AlreadyActive,
}

/// What a removal actually removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Removal {
    pub waiting: bool,
    pub active: bool,
}

impl Removal {
    pub fn any(&self) -> bool {
        self.waiting || self.active
    }
}

/// Store interface for admission state
///
/// TTL is enforced by the store: expired waiting entries and memberships are
/// invisible to every read, and never count toward ranks or capacity.
#[async_trait]
pub trait AdmissionStore: Send + Sync {
    /// Is the user a live active member
    async fn is_active(&self, user_id: &str) -> Result<bool>;

    /// 0-based rank among live waiting entries, in insertion order
    async fn waiting_rank(&self, user_id: &str) -> Result<Option<u64>>;

    /// Entry record of a live waiting user
    async fn find_entry(&self, user_id: &str) -> Result<Option<QueueEntry>>;

    /// Write the entry record and the ordered membership as one atomic unit
    ///
    /// The store assigns a strictly increasing sequence number under its write
    /// serialization; queue order follows that sequence alone, never the
    /// caller-supplied `arrived_at`.
    async fn insert_waiting(&self, entry: &QueueEntry) -> Result<InsertOutcome>;

    /// Live waiting entries
    async fn waiting_count(&self) -> Result<u64>;

    /// Live active members
    async fn active_count(&self) -> Result<u64>;

    /// Leading window of the waiting structure
    async fn peek_waiting(&self, limit: usize) -> Result<Vec<WaitingSlot>>;

    /// Remove from waiting, active, and entry records
    async fn remove_user(&self, user_id: &str) -> Result<Removal>;

    /// Delete everything (best-effort)
    async fn clear(&self) -> Result<()>;

    /// Begin a serialized promotion transaction
    async fn begin_promotion(&self) -> Result<Box<dyn PromotionTransaction>>;
}

// ============================================================================
// In-memory adapter (tests and single-process rooms)
// ============================================================================

pub mod memory {
    use super::*;
    use crate::domain::ActiveMembership;
    use crate::port::{TimeProvider, Transaction};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::Arc;
    use tokio::sync::{Mutex, OwnedMutexGuard};

    // Store-assigned sequence; arrival timestamps never reorder the queue
    type OrderKey = u64;

    #[derive(Debug, Clone, Default)]
    struct MemoryState {
        next_seq: u64,
        order: BTreeMap<OrderKey, String>,
        keys: HashMap<String, OrderKey>,
        entries: HashMap<String, QueueEntry>,
        active: HashMap<String, ActiveMembership>,
    }

    impl MemoryState {
        fn purge_expired(&mut self, now: i64) {
            let expired: Vec<String> = self
                .entries
                .values()
                .filter(|e| e.is_expired(now))
                .map(|e| e.user_id.clone())
                .collect();
            for user_id in expired {
                self.remove_waiting(&user_id);
            }
            self.active.retain(|_, m| !m.is_expired(now));
        }

        fn remove_waiting(&mut self, user_id: &str) -> bool {
            self.entries.remove(user_id);
            match self.keys.remove(user_id) {
                Some(key) => self.order.remove(&key).is_some(),
                None => false,
            }
        }

        fn is_live_waiting(&self, user_id: &str, now: i64) -> bool {
            self.entries
                .get(user_id)
                .map(|e| !e.is_expired(now))
                .unwrap_or(false)
        }

        fn live_order(&self, now: i64) -> impl Iterator<Item = (&OrderKey, &QueueEntry)> {
            self.order.iter().filter_map(move |(key, id)| {
                self.entries
                    .get(id)
                    .filter(|e| !e.is_expired(now))
                    .map(|e| (key, e))
            })
        }

        fn rank(&self, user_id: &str, now: i64) -> Option<u64> {
            if !self.is_live_waiting(user_id, now) {
                return None;
            }
            let key = self.keys.get(user_id)?;
            Some(
                self.live_order(now)
                    .take_while(|(k, _)| *k < key)
                    .count() as u64,
            )
        }

        fn active_count(&self, now: i64) -> u64 {
            self.active.values().filter(|m| !m.is_expired(now)).count() as u64
        }

        fn is_active(&self, user_id: &str, now: i64) -> bool {
            self.active
                .get(user_id)
                .map(|m| !m.is_expired(now))
                .unwrap_or(false)
        }
    }

    /// In-memory admission store
    ///
    /// One async mutex guards all state; a promotion transaction holds the
    /// guard until commit, which serializes overlapping sweeps.
    pub struct InMemoryAdmissionStore {
        state: Arc<Mutex<MemoryState>>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl InMemoryAdmissionStore {
        pub fn new(time_provider: Arc<dyn TimeProvider>) -> Self {
            Self {
                state: Arc::new(Mutex::new(MemoryState::default())),
                time_provider,
            }
        }
    }

    #[async_trait]
    impl AdmissionStore for InMemoryAdmissionStore {
        async fn is_active(&self, user_id: &str) -> Result<bool> {
            let now = self.time_provider.now_millis();
            Ok(self.state.lock().await.is_active(user_id, now))
        }

        async fn waiting_rank(&self, user_id: &str) -> Result<Option<u64>> {
            let now = self.time_provider.now_millis();
            Ok(self.state.lock().await.rank(user_id, now))
        }

        async fn find_entry(&self, user_id: &str) -> Result<Option<QueueEntry>> {
            let now = self.time_provider.now_millis();
            let state = self.state.lock().await;
            Ok(state
                .entries
                .get(user_id)
                .filter(|e| !e.is_expired(now))
                .cloned())
        }

        async fn insert_waiting(&self, entry: &QueueEntry) -> Result<InsertOutcome> {
            let now = self.time_provider.now_millis();
            let mut state = self.state.lock().await;
            state.purge_expired(now);

            if state.is_active(&entry.user_id, now) {
                return Ok(InsertOutcome::AlreadyActive);
            }
            if let Some(rank) = state.rank(&entry.user_id, now) {
                return Ok(InsertOutcome::AlreadyWaiting { rank });
            }

            state.next_seq += 1;
            let key = state.next_seq;
            state.order.insert(key, entry.user_id.clone());
            state.keys.insert(entry.user_id.clone(), key);
            state.entries.insert(entry.user_id.clone(), entry.clone());

            let rank = state.rank(&entry.user_id, now).unwrap_or(0);
            Ok(InsertOutcome::Inserted { rank })
        }

        async fn waiting_count(&self) -> Result<u64> {
            let now = self.time_provider.now_millis();
            Ok(self.state.lock().await.live_order(now).count() as u64)
        }

        async fn active_count(&self) -> Result<u64> {
            let now = self.time_provider.now_millis();
            Ok(self.state.lock().await.active_count(now))
        }

        async fn peek_waiting(&self, limit: usize) -> Result<Vec<WaitingSlot>> {
            let now = self.time_provider.now_millis();
            let state = self.state.lock().await;
            Ok(state
                .live_order(now)
                .take(limit)
                .map(|(_, e)| WaitingSlot {
                    user_id: e.user_id.clone(),
                    arrived_at: e.arrived_at,
                })
                .collect())
        }

        async fn remove_user(&self, user_id: &str) -> Result<Removal> {
            let now = self.time_provider.now_millis();
            let mut state = self.state.lock().await;
            let was_waiting = state.is_live_waiting(user_id, now);
            let was_active = state.is_active(user_id, now);
            state.remove_waiting(user_id);
            state.active.remove(user_id);
            Ok(Removal {
                waiting: was_waiting,
                active: was_active,
            })
        }

        async fn clear(&self) -> Result<()> {
            *self.state.lock().await = MemoryState::default();
            Ok(())
        }

        async fn begin_promotion(&self) -> Result<Box<dyn PromotionTransaction>> {
            let guard = Arc::clone(&self.state).lock_owned().await;
            let snapshot = guard.clone();
            Ok(Box::new(MemoryPromotion {
                guard,
                snapshot: Some(snapshot),
                time_provider: Arc::clone(&self.time_provider),
            }))
        }
    }

    /// Promotion transaction over the locked state; restores the snapshot
    /// unless committed.
    struct MemoryPromotion {
        guard: OwnedMutexGuard<MemoryState>,
        snapshot: Option<MemoryState>,
        time_provider: Arc<dyn TimeProvider>,
    }

    impl Drop for MemoryPromotion {
        fn drop(&mut self) {
            if let Some(snapshot) = self.snapshot.take() {
                *self.guard = snapshot;
            }
        }
    }

    #[async_trait]
    impl Transaction for MemoryPromotion {
        async fn commit(mut self: Box<Self>) -> Result<()> {
            self.snapshot = None;
            Ok(())
        }

        async fn rollback(self: Box<Self>) -> Result<()> {
            // Drop restores the snapshot
            Ok(())
        }
    }

    #[async_trait]
    impl PromotionTransaction for MemoryPromotion {
        async fn active_count(&mut self) -> Result<u64> {
            let now = self.time_provider.now_millis();
            self.guard.purge_expired(now);
            Ok(self.guard.active_count(now))
        }

        async fn pop_earliest(&mut self, limit: u64) -> Result<Vec<WaitingSlot>> {
            let now = self.time_provider.now_millis();
            let popped: Vec<WaitingSlot> = self
                .guard
                .live_order(now)
                .take(limit as usize)
                .map(|(_, e)| WaitingSlot {
                    user_id: e.user_id.clone(),
                    arrived_at: e.arrived_at,
                })
                .collect();
            for slot in &popped {
                self.guard.remove_waiting(&slot.user_id);
            }
            Ok(popped)
        }

        async fn admit(&mut self, membership: &ActiveMembership) -> Result<()> {
            self.guard
                .active
                .insert(membership.user_id.clone(), membership.clone());
            Ok(())
        }
    }

}
