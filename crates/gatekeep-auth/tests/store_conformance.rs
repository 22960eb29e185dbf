//! Conformance suite both session store backends must pass.
//!
//! The in-memory backend runs unconditionally; the PostgreSQL backend runs
//! the same checks behind `#[ignore]` against `DATABASE_URL`.

use chrono::{Duration, Utc};
use uuid::Uuid;

use gatekeep_auth::session::{
    MemorySessionStore, SessionId, SessionRecord, SessionStore,
};

fn record(user_id: Uuid, fingerprint: &str, ttl: Duration) -> SessionRecord {
    let now = Utc::now();
    SessionRecord {
        id: SessionId::generate(),
        user_id,
        username: "conformance".to_string(),
        role_name: "operator".to_string(),
        permissions: vec!["orders:read".to_string()],
        token_fingerprint: fingerprint.to_string(),
        created_at: now,
        expires_at: now + ttl,
        last_activity: now,
        is_active: true,
    }
}

async fn put_get_roundtrip(store: &dyn SessionStore) {
    let user = Uuid::new_v4();
    let rec = record(user, "fp-roundtrip", Duration::minutes(30));
    store.put(&rec).await.unwrap();

    let by_id = store.get_by_id(&rec.id).await.unwrap().unwrap();
    assert_eq!(by_id.user_id, user);
    assert_eq!(by_id.token_fingerprint, "fp-roundtrip");
    assert!(by_id.is_active);

    let by_fp = store.get_by_fingerprint("fp-roundtrip").await.unwrap().unwrap();
    assert_eq!(by_fp.id, rec.id);

    assert!(store.get_by_fingerprint("fp-unknown").await.unwrap().is_none());
    assert!(
        store
            .get_by_id(&SessionId::generate())
            .await
            .unwrap()
            .is_none()
    );
}

async fn fingerprint_rotation_keeps_indexes_consistent(store: &dyn SessionStore) {
    let user = Uuid::new_v4();
    let mut rec = record(user, "fp-old", Duration::minutes(30));
    store.put(&rec).await.unwrap();

    rec.token_fingerprint = "fp-new".to_string();
    rec.expires_at = Utc::now() + Duration::minutes(45);
    store.update(&rec).await.unwrap();

    assert!(store.get_by_fingerprint("fp-old").await.unwrap().is_none());
    let found = store.get_by_fingerprint("fp-new").await.unwrap().unwrap();
    assert_eq!(found.id, rec.id);
}

async fn duplicate_active_fingerprint_is_rejected(store: &dyn SessionStore) {
    let rec = record(Uuid::new_v4(), "fp-dup", Duration::minutes(30));
    store.put(&rec).await.unwrap();

    let clash = record(Uuid::new_v4(), "fp-dup", Duration::minutes(30));
    assert!(store.put(&clash).await.is_err());

    // A deactivated session frees its fingerprint for reuse.
    store.deactivate(&rec.id).await.unwrap();
    store.put(&clash).await.unwrap();
}

async fn deactivate_is_terminal_and_reported_once(store: &dyn SessionStore) {
    let rec = record(Uuid::new_v4(), "fp-deact", Duration::minutes(30));
    store.put(&rec).await.unwrap();

    assert!(store.deactivate(&rec.id).await.unwrap());
    assert!(!store.deactivate(&rec.id).await.unwrap());

    let stored = store.get_by_id(&rec.id).await.unwrap().unwrap();
    assert!(!stored.is_active);
    assert!(store.get_by_fingerprint("fp-deact").await.unwrap().is_none());
}

async fn user_listing_and_counts(store: &dyn SessionStore) {
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();

    for i in 0..3 {
        store
            .put(&record(user, &format!("fp-user-{i}"), Duration::minutes(30)))
            .await
            .unwrap();
    }
    store
        .put(&record(other, "fp-other", Duration::minutes(30)))
        .await
        .unwrap();

    assert_eq!(store.count_active_for_user(user).await.unwrap(), 3);
    let listed = store.list_by_user(user).await.unwrap();
    assert_eq!(listed.len(), 3);
    // Oldest first.
    assert!(listed.windows(2).all(|w| w[0].created_at <= w[1].created_at));

    assert_eq!(store.deactivate_all_for_user(user).await.unwrap(), 3);
    assert_eq!(store.count_active_for_user(user).await.unwrap(), 0);
    assert_eq!(store.count_active_for_user(other).await.unwrap(), 1);
}

async fn sweep_deactivates_exactly_the_expired(store: &dyn SessionStore) {
    let user = Uuid::new_v4();
    let expired_a = record(user, "fp-exp-a", Duration::minutes(-10));
    let expired_b = record(user, "fp-exp-b", Duration::seconds(-1));
    let live = record(user, "fp-live", Duration::minutes(30));
    store.put(&expired_a).await.unwrap();
    store.put(&expired_b).await.unwrap();
    store.put(&live).await.unwrap();

    assert_eq!(store.sweep_expired(Utc::now()).await.unwrap(), 2);
    assert!(!store.get_by_id(&expired_a.id).await.unwrap().unwrap().is_active);
    assert!(!store.get_by_id(&expired_b.id).await.unwrap().unwrap().is_active);
    assert!(store.get_by_id(&live.id).await.unwrap().unwrap().is_active);

    // Idempotent: a second pass finds nothing new.
    assert_eq!(store.sweep_expired(Utc::now()).await.unwrap(), 0);
}

async fn update_of_unknown_session_fails(store: &dyn SessionStore) {
    let rec = record(Uuid::new_v4(), "fp-ghost", Duration::minutes(30));
    assert!(store.update(&rec).await.is_err());
}

async fn stats_track_totals(store: &dyn SessionStore) {
    let before = store.stats().await.unwrap();

    let rec = record(Uuid::new_v4(), "fp-stats", Duration::minutes(30));
    store.put(&rec).await.unwrap();

    let mid = store.stats().await.unwrap();
    assert_eq!(mid.total_sessions, before.total_sessions + 1);
    assert_eq!(mid.active_sessions, before.active_sessions + 1);

    store.deactivate(&rec.id).await.unwrap();
    let after = store.stats().await.unwrap();
    assert_eq!(after.total_sessions, mid.total_sessions);
    assert_eq!(after.active_sessions, mid.active_sessions - 1);
}

async fn run_suite(store: &dyn SessionStore) {
    put_get_roundtrip(store).await;
    fingerprint_rotation_keeps_indexes_consistent(store).await;
    duplicate_active_fingerprint_is_rejected(store).await;
    deactivate_is_terminal_and_reported_once(store).await;
    user_listing_and_counts(store).await;
    sweep_deactivates_exactly_the_expired(store).await;
    update_of_unknown_session_fails(store).await;
    stats_track_totals(store).await;
}

#[tokio::test]
async fn memory_store_passes_conformance() {
    let store = MemorySessionStore::new(64);
    run_suite(&store).await;
}

/// Requires a live PostgreSQL at DATABASE_URL. Run with:
/// `DATABASE_URL=postgres://... cargo test -- --ignored`
#[tokio::test]
#[ignore]
async fn postgres_store_passes_conformance() {
    use gatekeep_auth::session::PgSessionStore;
    use gatekeep_core::config::DatabaseConfig;

    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgSessionStore::connect(&DatabaseConfig {
        url,
        ..DatabaseConfig::default()
    })
    .await
    .expect("failed to connect");

    sqlx::query("TRUNCATE sessions")
        .execute(store.pool())
        .await
        .expect("failed to truncate sessions");

    run_suite(&store).await;
}
