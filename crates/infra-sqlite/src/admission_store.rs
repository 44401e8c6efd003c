// SQLite AdmissionStore Implementation

use crate::{map_sqlx_error, SqlitePromotion};
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::debug;
use waitroom_core::domain::{QueueEntry, WaitingSlot};
use waitroom_core::error::Result;
use waitroom_core::port::{
    AdmissionStore, InsertOutcome, PromotionTransaction, Removal, TimeProvider,
};

pub struct SqliteAdmissionStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteAdmissionStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    /// Begin a transaction that already holds the database write lock
    async fn begin_write(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        take_write_lock(&mut tx).await?;
        Ok(tx)
    }
}

// ============================================================================
// Statement helpers (shared with the promotion transaction)
// ============================================================================

/// First write of a transaction: takes SQLite's write lock up front so the
/// reads that follow cannot go stale before commit.
pub(crate) async fn take_write_lock(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("UPDATE promotion_lock SET epoch = epoch + 1 WHERE id = 1")
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(())
}

/// Physically delete rows whose TTL has passed (reads already ignore them)
pub(crate) async fn purge_expired(conn: &mut SqliteConnection, now: i64) -> Result<()> {
    for sql in [
        "DELETE FROM waiting WHERE expires_at <= ?",
        "DELETE FROM entries WHERE expires_at <= ?",
        "DELETE FROM active WHERE expires_at <= ?",
    ] {
        sqlx::query(sql)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

/// 0-based rank among live waiting rows, by insertion sequence
pub(crate) async fn live_rank(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: i64,
) -> Result<Option<u64>> {
    let own: Option<i64> =
        sqlx::query_scalar("SELECT seq FROM waiting WHERE user_id = ? AND expires_at > ?")
            .bind(user_id)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

    let Some(seq) = own else {
        return Ok(None);
    };

    let ahead: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM waiting WHERE expires_at > ? AND seq < ?")
            .bind(now)
            .bind(seq)
            .fetch_one(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

    Ok(Some(ahead as u64))
}

pub(crate) async fn live_active(
    conn: &mut SqliteConnection,
    user_id: &str,
    now: i64,
) -> Result<bool> {
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM active WHERE user_id = ? AND expires_at > ?")
            .bind(user_id)
            .bind(now)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    Ok(found.is_some())
}

pub(crate) async fn live_active_count(conn: &mut SqliteConnection, now: i64) -> Result<u64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM active WHERE expires_at > ?")
        .bind(now)
        .fetch_one(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(count as u64)
}

pub(crate) async fn head_of_queue(
    conn: &mut SqliteConnection,
    limit: i64,
    now: i64,
) -> Result<Vec<WaitingSlot>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        r#"
        SELECT user_id, arrived_at FROM waiting
        WHERE expires_at > ?
        ORDER BY seq ASC
        LIMIT ?
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(rows
        .into_iter()
        .map(|(user_id, arrived_at)| WaitingSlot {
            user_id,
            arrived_at,
        })
        .collect())
}

/// Remove a user's waiting row and entry record
pub(crate) async fn delete_waiting(conn: &mut SqliteConnection, user_id: &str) -> Result<u64> {
    let removed = sqlx::query("DELETE FROM waiting WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?
        .rows_affected();
    sqlx::query("DELETE FROM entries WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    Ok(removed)
}

#[async_trait]
impl AdmissionStore for SqliteAdmissionStore {
    async fn is_active(&self, user_id: &str) -> Result<bool> {
        let now = self.time_provider.now_millis();
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        live_active(&mut conn, user_id, now).await
    }

    async fn waiting_rank(&self, user_id: &str) -> Result<Option<u64>> {
        let now = self.time_provider.now_millis();
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        live_rank(&mut conn, user_id, now).await
    }

    async fn find_entry(&self, user_id: &str) -> Result<Option<QueueEntry>> {
        let now = self.time_provider.now_millis();
        let row = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT user_id, queue_token, arrived_at, email, metadata, expires_at
            FROM entries
            WHERE user_id = ? AND expires_at > ?
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(EntryRow::into_entry).transpose()
    }

    async fn insert_waiting(&self, entry: &QueueEntry) -> Result<InsertOutcome> {
        let now = self.time_provider.now_millis();
        let mut tx = self.begin_write().await?;

        purge_expired(&mut tx, now).await?;

        if live_active(&mut tx, &entry.user_id, now).await? {
            tx.commit().await.map_err(map_sqlx_error)?;
            return Ok(InsertOutcome::AlreadyActive);
        }
        if let Some(rank) = live_rank(&mut tx, &entry.user_id, now).await? {
            tx.commit().await.map_err(map_sqlx_error)?;
            return Ok(InsertOutcome::AlreadyWaiting { rank });
        }

        sqlx::query("INSERT INTO waiting (user_id, arrived_at, expires_at) VALUES (?, ?, ?)")
            .bind(&entry.user_id)
            .bind(entry.arrived_at)
            .bind(entry.expires_at)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO entries (
                user_id, queue_token, arrived_at, email, metadata, expires_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.user_id)
        .bind(&entry.queue_token)
        .bind(entry.arrived_at)
        .bind(&entry.email)
        .bind(entry.metadata.to_string())
        .bind(entry.expires_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let rank = live_rank(&mut tx, &entry.user_id, now).await?.unwrap_or(0);
        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(user_id = %entry.user_id, rank, "Waiting entry inserted");
        Ok(InsertOutcome::Inserted { rank })
    }

    async fn waiting_count(&self) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waiting WHERE expires_at > ?")
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(count as u64)
    }

    async fn active_count(&self) -> Result<u64> {
        let now = self.time_provider.now_millis();
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        live_active_count(&mut conn, now).await
    }

    async fn peek_waiting(&self, limit: usize) -> Result<Vec<WaitingSlot>> {
        let now = self.time_provider.now_millis();
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        head_of_queue(&mut conn, limit as i64, now).await
    }

    async fn remove_user(&self, user_id: &str) -> Result<Removal> {
        let now = self.time_provider.now_millis();
        let mut tx = self.begin_write().await?;

        let waiting = live_rank(&mut tx, user_id, now).await?.is_some();
        let active = live_active(&mut tx, user_id, now).await?;

        delete_waiting(&mut tx, user_id).await?;
        sqlx::query("DELETE FROM active WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(Removal { waiting, active })
    }

    async fn clear(&self) -> Result<()> {
        let mut tx = self.begin_write().await?;
        for sql in ["DELETE FROM waiting", "DELETE FROM active", "DELETE FROM entries"] {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn begin_promotion(&self) -> Result<Box<dyn PromotionTransaction>> {
        let tx = self.begin_write().await?;
        Ok(Box::new(SqlitePromotion::new(
            tx,
            Arc::clone(&self.time_provider),
        )))
    }
}

/// SQLite row representation of an entry record
#[derive(Debug, sqlx::FromRow)]
struct EntryRow {
    user_id: String,
    queue_token: String,
    arrived_at: i64,
    email: Option<String>,
    metadata: String,
    expires_at: i64,
}

impl EntryRow {
    fn into_entry(self) -> Result<QueueEntry> {
        let metadata: serde_json::Value = serde_json::from_str(&self.metadata)?;

        Ok(QueueEntry {
            user_id: self.user_id,
            queue_token: self.queue_token,
            arrived_at: self.arrived_at,
            expires_at: self.expires_at,
            email: self.email,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{create_pool, run_migrations};
    use waitroom_core::domain::{ActiveMembership, EntryAttrs};
    use waitroom_core::error::AppError;
    use waitroom_core::port::time_provider::mocks::ManualClock;

    const START: i64 = 1_700_000_000_000;
    const TTL: i64 = 30 * 60 * 1000;

    async fn setup_store() -> (SqliteAdmissionStore, Arc<ManualClock>) {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        let clock = Arc::new(ManualClock::new(START));
        (SqliteAdmissionStore::new(pool, clock.clone()), clock)
    }

    fn entry(user_id: &str, arrived_at: i64) -> QueueEntry {
        QueueEntry::new(
            user_id,
            format!("qt-{}", user_id),
            arrived_at,
            TTL,
            EntryAttrs {
                email: Some(format!("{}@example.com", user_id)),
                metadata: Some(serde_json::json!({"plan": "pro"})),
            },
        )
    }

    #[tokio::test]
    async fn test_insert_and_find_entry() {
        let (store, _clock) = setup_store().await;

        let outcome = store.insert_waiting(&entry("alice", START)).await.unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted { rank: 0 });

        let found = store.find_entry("alice").await.unwrap().unwrap();
        assert_eq!(found.queue_token, "qt-alice");
        assert_eq!(found.email.as_deref(), Some("alice@example.com"));
        assert_eq!(found.metadata["plan"], "pro");
        assert_eq!(found.expires_at, START + TTL);
    }

    #[tokio::test]
    async fn test_rank_breaks_ties_by_sequence() {
        let (store, _clock) = setup_store().await;

        for id in ["a", "b", "c"] {
            store.insert_waiting(&entry(id, START)).await.unwrap();
        }

        assert_eq!(store.waiting_rank("a").await.unwrap(), Some(0));
        assert_eq!(store.waiting_rank("c").await.unwrap(), Some(2));
        let head = store.peek_waiting(2).await.unwrap();
        assert_eq!(head[0].user_id, "a");
        assert_eq!(head[1].user_id, "b");
    }

    #[tokio::test]
    async fn test_rank_follows_commit_order_not_timestamp() {
        let (store, _clock) = setup_store().await;

        // "b" commits first but carries the later timestamp
        store.insert_waiting(&entry("b", START + 5)).await.unwrap();
        let a = store.insert_waiting(&entry("a", START)).await.unwrap();

        assert_eq!(a, InsertOutcome::Inserted { rank: 1 });
        assert_eq!(store.waiting_rank("b").await.unwrap(), Some(0));
        assert_eq!(store.waiting_rank("a").await.unwrap(), Some(1));

        let head = store.peek_waiting(2).await.unwrap();
        assert_eq!(head[0].user_id, "b");
        assert_eq!(head[0].arrived_at, START + 5);

        let mut tx = store.begin_promotion().await.unwrap();
        let popped = tx.pop_earliest(1).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(popped[0].user_id, "b");
    }

    #[tokio::test]
    async fn test_corrupt_metadata_is_an_error() {
        let (store, _clock) = setup_store().await;
        sqlx::query(
            r#"
            INSERT INTO entries (user_id, queue_token, arrived_at, email, metadata, expires_at)
            VALUES ('broken', 'qt-broken', ?, NULL, 'not json', ?)
            "#,
        )
        .bind(START)
        .bind(START + TTL)
        .execute(&store.pool)
        .await
        .unwrap();

        let result = store.find_entry("broken").await;
        assert!(matches!(result, Err(AppError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_duplicate_insert_reports_existing_rank() {
        let (store, _clock) = setup_store().await;

        store.insert_waiting(&entry("a", START)).await.unwrap();
        store.insert_waiting(&entry("b", START + 1)).await.unwrap();
        let again = store.insert_waiting(&entry("b", START + 2)).await.unwrap();

        assert_eq!(again, InsertOutcome::AlreadyWaiting { rank: 1 });
        assert_eq!(store.waiting_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_promotion_moves_users_atomically() {
        let (store, _clock) = setup_store().await;
        for (i, id) in ["a", "b", "c"].iter().enumerate() {
            store.insert_waiting(&entry(id, START + i as i64)).await.unwrap();
        }

        let mut tx = store.begin_promotion().await.unwrap();
        assert_eq!(tx.active_count().await.unwrap(), 0);
        let popped = tx.pop_earliest(2).await.unwrap();
        for slot in &popped {
            tx.admit(&ActiveMembership::new(slot.user_id.clone(), START, TTL))
                .await
                .unwrap();
        }
        tx.commit().await.unwrap();

        assert_eq!(popped.len(), 2);
        assert!(store.is_active("a").await.unwrap());
        assert!(store.is_active("b").await.unwrap());
        assert!(store.find_entry("a").await.unwrap().is_none());
        assert_eq!(store.waiting_rank("c").await.unwrap(), Some(0));
        assert_eq!(
            store.insert_waiting(&entry("a", START + 10)).await.unwrap(),
            InsertOutcome::AlreadyActive
        );
    }

    #[tokio::test]
    async fn test_dropped_promotion_rolls_back() {
        let (store, _clock) = setup_store().await;
        store.insert_waiting(&entry("a", START)).await.unwrap();

        {
            let mut tx = store.begin_promotion().await.unwrap();
            tx.pop_earliest(1).await.unwrap();
        }

        assert_eq!(store.waiting_rank("a").await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_remove_user_reports_membership() {
        let (store, _clock) = setup_store().await;
        store.insert_waiting(&entry("a", START)).await.unwrap();

        let removal = store.remove_user("a").await.unwrap();
        assert_eq!(
            removal,
            Removal {
                waiting: true,
                active: false
            }
        );
        assert!(!store.remove_user("a").await.unwrap().any());
        assert!(store.find_entry("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_rows_are_ignored_and_purged() {
        let (store, clock) = setup_store().await;
        store.insert_waiting(&entry("a", START)).await.unwrap();

        clock.advance_millis(TTL);

        assert_eq!(store.waiting_rank("a").await.unwrap(), None);
        assert_eq!(store.waiting_count().await.unwrap(), 0);

        // Re-join after expiry creates a fresh entry
        let outcome = store
            .insert_waiting(&entry("a", START + TTL))
            .await
            .unwrap();
        assert_eq!(outcome, InsertOutcome::Inserted { rank: 0 });
    }

    #[tokio::test]
    async fn test_clear() {
        let (store, _clock) = setup_store().await;
        store.insert_waiting(&entry("a", START)).await.unwrap();

        store.clear().await.unwrap();

        assert_eq!(store.waiting_count().await.unwrap(), 0);
        assert_eq!(store.active_count().await.unwrap(), 0);
        assert!(store.find_entry("a").await.unwrap().is_none());
    }
}
