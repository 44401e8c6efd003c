//! Admission flow over the SQLite store
//!
//! Drives the service with a manual clock so TTL behavior is deterministic.

use std::sync::Arc;

use waitroom_core::application::{
    AdmissionController, JoinRequest, PromotionScheduler, WaitingRoomService,
};
use waitroom_core::domain::{AdmissionState, Capacity, QueueEvent};
use waitroom_core::port::id_provider::mocks::SequentialIdProvider;
use waitroom_core::port::notifier::mocks::RecordingNotifier;
use waitroom_core::port::time_provider::mocks::ManualClock;
use waitroom_core::port::{AdmissionStore, TimeProvider, UuidProvider};
use waitroom_infra_sqlite::{create_pool, database_url, run_migrations, SqliteAdmissionStore};
use waitroom_infra_token::{OpaqueTokenIssuer, DEFAULT_TOKEN_TTL_HOURS};

const START: i64 = 1_767_225_600_000; // 2026-01-01T00:00:00Z

struct Harness {
    service: WaitingRoomService,
    store: Arc<SqliteAdmissionStore>,
    clock: Arc<ManualClock>,
    notifier: Arc<RecordingNotifier>,
}

async fn harness(max_concurrent_users: u32) -> Harness {
    let pool = create_pool(&database_url(":memory:")).await.unwrap();
    run_migrations(&pool).await.unwrap();

    let clock = Arc::new(ManualClock::new(START));
    let time: Arc<dyn TimeProvider> = clock.clone();
    let store = Arc::new(SqliteAdmissionStore::new(pool, time.clone()));
    let notifier = Arc::new(RecordingNotifier::new());
    let issuer = Arc::new(OpaqueTokenIssuer::new(time.clone(), DEFAULT_TOKEN_TTL_HOURS).unwrap());
    let capacity = Capacity::new(max_concurrent_users, 30, 180, 5).unwrap();

    let controller = Arc::new(AdmissionController::new(
        store.clone(),
        Arc::new(SequentialIdProvider::new("qt")),
        time.clone(),
        capacity,
    ));
    let scheduler = Arc::new(PromotionScheduler::new(
        controller.clone(),
        issuer.clone(),
        notifier.clone(),
        time.clone(),
    ));
    let service = WaitingRoomService::new(controller, scheduler, issuer, notifier.clone(), time);

    Harness {
        service,
        store,
        clock,
        notifier,
    }
}

#[tokio::test]
async fn test_first_come_first_served() {
    let h = harness(2).await;

    let alice = h.service.join(JoinRequest::new("alice")).await.unwrap();
    let bob = h.service.join(JoinRequest::new("bob")).await.unwrap();
    let carol = h.service.join(JoinRequest::new("carol")).await.unwrap();
    h.clock.advance_millis(1);
    let dave = h.service.join(JoinRequest::new("dave")).await.unwrap();

    assert!(alice.can_access);
    assert!(bob.can_access);
    assert_eq!(carol.status, AdmissionState::Waiting);
    assert_eq!(carol.position, Some(1));
    assert_eq!(dave.position, Some(2));
    assert_eq!(carol.queue_token.as_deref(), Some("qt-3"));

    let info = h.service.info().await.unwrap();
    assert_eq!(info.queue_length, 2);
    assert_eq!(info.active_users, 2);
    assert_eq!(info.available_slots, 0);
    let order: Vec<_> = info.next_in_queue.iter().map(|u| u.user_id.as_str()).collect();
    assert_eq!(order, vec!["carol", "dave"]);
    assert_eq!(info.next_in_queue[0].joined_at, "2026-01-01T00:00:00.000Z");

    // A leaving active user hands the slot to the head of the queue
    let left = h.service.leave("alice").await.unwrap();
    assert!(left.removed);

    let carol_now = h.service.status("carol").await.unwrap();
    assert_eq!(carol_now.status, AdmissionState::Active);
    let dave_now = h.service.status("dave").await.unwrap();
    assert_eq!(dave_now.position, Some(1));
    assert_eq!(dave_now.total_in_queue, Some(1));

    let ready = h.notifier.events_for("carol");
    assert!(ready
        .iter()
        .any(|e| matches!(e, QueueEvent::QueueReady { .. })));
}

#[tokio::test]
async fn test_rejoin_is_idempotent() {
    let h = harness(1).await;

    h.service.join(JoinRequest::new("alice")).await.unwrap();
    let first = h.service.join(JoinRequest::new("bob")).await.unwrap();
    let again = h.service.join(JoinRequest::new("bob")).await.unwrap();

    assert_eq!(first.position, again.position);
    assert!(again.queue_token.is_none());
    assert_eq!(h.store.waiting_count().await.unwrap(), 1);

    // Already active: a fresh token, still one membership
    let active_again = h.service.join(JoinRequest::new("alice")).await.unwrap();
    assert!(active_again.can_access);
    assert_eq!(h.store.active_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_expired_memberships_free_capacity() {
    let h = harness(2).await;

    h.service.join(JoinRequest::new("alice")).await.unwrap();
    h.service.join(JoinRequest::new("bob")).await.unwrap();

    h.clock.advance_minutes(20);
    let carol = h.service.join(JoinRequest::new("carol")).await.unwrap();
    assert_eq!(carol.position, Some(1));

    // alice and bob time out; carol's entry is only 11 minutes old
    h.clock.advance_minutes(11);
    assert_eq!(
        h.service.status("alice").await.unwrap().status,
        AdmissionState::NotInQueue
    );

    let report = h.service.scheduler().sweep().await.unwrap();
    assert_eq!(report.admitted.len(), 1);
    assert_eq!(report.admitted[0].user_id, "carol");
    assert_eq!(h.store.active_count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_expired_waiting_entry_is_not_promoted() {
    let h = harness(1).await;

    h.service.join(JoinRequest::new("alice")).await.unwrap();
    h.service.join(JoinRequest::new("bob")).await.unwrap();

    h.clock.advance_minutes(31);

    let report = h.service.scheduler().sweep().await.unwrap();
    assert!(report.admitted.is_empty());
    assert_eq!(
        h.service.status("bob").await.unwrap().status,
        AdmissionState::NotInQueue
    );
}

#[tokio::test]
async fn test_verify_tracks_membership() {
    let h = harness(1).await;

    let alice = h.service.join(JoinRequest::new("alice")).await.unwrap();
    let token = alice.access_token.unwrap();

    let verified = h.service.verify(&token).await.unwrap();
    assert!(verified.valid);
    assert_eq!(verified.user_id, "alice");

    h.service.leave("alice").await.unwrap();

    let after = h.service.verify(&token).await.unwrap();
    assert!(!after.valid);
    assert_eq!(after.status, AdmissionState::NotInQueue);

    assert!(h.service.verify("wr_unknown").await.is_err());
}

#[tokio::test]
async fn test_clear_resets_everything() {
    let h = harness(1).await;

    for user in ["a", "b", "c"] {
        h.service.join(JoinRequest::new(user)).await.unwrap();
    }
    h.notifier.clear();

    let result = h.service.clear().await.unwrap();
    assert_eq!(result.message, "Queue cleared successfully");
    assert_eq!(h.notifier.names(), vec!["queue-cleared"]);

    let info = h.service.info().await.unwrap();
    assert_eq!(info.queue_length, 0);
    assert_eq!(info.active_users, 0);
    assert!(h.store.find_entry("b").await.unwrap().is_none());
}

#[tokio::test]
async fn test_entries_survive_reopen() {
    let path = std::env::temp_dir().join(format!("waitroom_reopen_{}.db", uuid::Uuid::new_v4()));
    let url = database_url(&path.to_string_lossy());
    let capacity = Capacity::new(1, 30, 180, 5).unwrap();

    {
        let pool = create_pool(&url).await.unwrap();
        run_migrations(&pool).await.unwrap();
        let store = Arc::new(SqliteAdmissionStore::new(
            pool.clone(),
            Arc::new(waitroom_core::port::SystemTimeProvider),
        ));
        let controller = AdmissionController::new(
            store,
            Arc::new(UuidProvider),
            Arc::new(waitroom_core::port::SystemTimeProvider),
            capacity,
        );
        controller
            .enqueue("alice", Default::default())
            .await
            .unwrap();
        controller.enqueue("bob", Default::default()).await.unwrap();
        controller.promote().await.unwrap();
        pool.close().await;
    }

    let pool = create_pool(&url).await.unwrap();
    run_migrations(&pool).await.unwrap();
    let store = SqliteAdmissionStore::new(pool.clone(), Arc::new(waitroom_core::port::SystemTimeProvider));

    assert!(store.is_active("alice").await.unwrap());
    assert_eq!(store.waiting_rank("bob").await.unwrap(), Some(0));

    pool.close().await;
    let _ = std::fs::remove_file(&path);
}
