//! Concurrency over a file-backed SQLite store
//!
//! Several pooled connections race on the same database file; capacity
//! and FIFO order must hold regardless of interleaving.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use sqlx::SqlitePool;
use waitroom_core::application::{AdmissionController, PromotionScheduler};
use waitroom_core::domain::{Capacity, EnqueueOutcome, EntryAttrs};
use waitroom_core::port::{AdmissionStore, NoopNotifier, SystemTimeProvider, UuidProvider};
use waitroom_infra_sqlite::{create_pool, database_url, run_migrations, SqliteAdmissionStore};
use waitroom_infra_token::OpaqueTokenIssuer;

struct TempDb {
    path: PathBuf,
    pool: SqlitePool,
}

impl TempDb {
    async fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("waitroom_{}_{}.db", name, uuid::Uuid::new_v4()));
        let pool = create_pool(&database_url(&path.to_string_lossy()))
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        Self { path, pool }
    }

    async fn cleanup(self) {
        self.pool.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", self.path.display(), suffix));
        }
    }
}

fn controller(pool: &SqlitePool, max_concurrent_users: u32) -> (Arc<AdmissionController>, Arc<SqliteAdmissionStore>) {
    let store = Arc::new(SqliteAdmissionStore::new(
        pool.clone(),
        Arc::new(SystemTimeProvider),
    ));
    let controller = Arc::new(AdmissionController::new(
        store.clone(),
        Arc::new(UuidProvider),
        Arc::new(SystemTimeProvider),
        Capacity::new(max_concurrent_users, 30, 180, 5).unwrap(),
    ));
    (controller, store)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sweeps_never_exceed_capacity() {
    let db = TempDb::new("sweeps").await;
    let (controller, store) = controller(&db.pool, 3);

    for i in 0..20 {
        controller
            .enqueue(&format!("user-{:02}", i), EntryAttrs::default())
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..8 {
        let controller = controller.clone();
        handles.push(tokio::spawn(async move { controller.promote().await }));
    }

    let mut promoted = Vec::new();
    for handle in handles {
        promoted.extend(handle.await.unwrap().unwrap());
    }

    assert_eq!(promoted.len(), 3, "exactly the free slots are filled");
    let unique: HashSet<_> = promoted.iter().collect();
    assert_eq!(unique.len(), 3, "no user promoted twice");
    assert_eq!(store.active_count().await.unwrap(), 3);
    assert_eq!(store.waiting_count().await.unwrap(), 17);

    let active_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM active")
        .fetch_one(&db.pool)
        .await
        .unwrap();
    assert_eq!(active_rows, 3);

    db.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_joins_get_distinct_positions() {
    let db = TempDb::new("joins").await;
    let (controller, store) = controller(&db.pool, 1);

    let mut handles = Vec::new();
    for i in 0..30 {
        let controller = controller.clone();
        handles.push(tokio::spawn(async move {
            controller
                .enqueue(&format!("user-{:02}", i), EntryAttrs::default())
                .await
        }));
    }

    let mut positions = Vec::new();
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            EnqueueOutcome::Joined(entry) => positions.push(entry.position),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    positions.sort_unstable();
    assert_eq!(positions, (1..=30).collect::<Vec<u64>>());
    assert_eq!(store.waiting_count().await.unwrap(), 30);

    db.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_user_joining_concurrently_gets_one_entry() {
    let db = TempDb::new("dupes").await;
    let (controller, store) = controller(&db.pool, 1);

    let mut handles = Vec::new();
    for _ in 0..10 {
        let controller = controller.clone();
        handles.push(tokio::spawn(async move {
            controller.enqueue("alice", EntryAttrs::default()).await
        }));
    }

    let mut joined = 0;
    for handle in handles {
        if let EnqueueOutcome::Joined(_) = handle.await.unwrap().unwrap() {
            joined += 1;
        }
    }

    assert_eq!(joined, 1);
    assert_eq!(store.waiting_count().await.unwrap(), 1);

    db.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_promotion_follows_arrival_order() {
    let db = TempDb::new("fifo").await;
    let (controller, _store) = controller(&db.pool, 2);

    for name in ["first", "second", "third", "fourth"] {
        controller.enqueue(name, EntryAttrs::default()).await.unwrap();
    }

    assert_eq!(controller.promote().await.unwrap(), vec!["first", "second"]);
    controller.dequeue("first").await.unwrap();
    assert_eq!(controller.promote().await.unwrap(), vec!["third"]);

    db.cleanup().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_overlapping_sweeps_issue_one_token_per_admission() {
    let db = TempDb::new("scheduler").await;
    let (controller, store) = controller(&db.pool, 2);
    let issuer = Arc::new(OpaqueTokenIssuer::new(Arc::new(SystemTimeProvider), 1).unwrap());
    let scheduler = Arc::new(PromotionScheduler::new(
        controller.clone(),
        issuer.clone(),
        Arc::new(NoopNotifier),
        Arc::new(SystemTimeProvider),
    ));

    for i in 0..6 {
        controller
            .enqueue(&format!("user-{}", i), EntryAttrs::default())
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for _ in 0..5 {
        let scheduler = scheduler.clone();
        handles.push(tokio::spawn(async move { scheduler.sweep().await }));
    }

    let mut admitted = Vec::new();
    for handle in handles {
        admitted.extend(handle.await.unwrap().unwrap().admitted);
    }

    assert_eq!(admitted.len(), 2);
    assert_eq!(issuer.len().await, 2);
    assert_eq!(store.active_count().await.unwrap(), 2);

    db.cleanup().await;
}
