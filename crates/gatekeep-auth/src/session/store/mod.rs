//! Session store contract and backends.
//!
//! Both backends keep the primary record and the fingerprint/user secondary
//! indexes mutually consistent: the in-memory backend mutates them under one
//! write lock, the PostgreSQL backend confines every mutation to a single
//! statement and lets the database's per-statement atomicity carry the
//! invariant.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gatekeep_core::result::AppResult;

use super::model::{SessionId, SessionRecord};

/// Aggregate counts over the whole store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoreStats {
    /// All records, active or not.
    pub total_sessions: u64,
    /// Records with `is_active` set.
    pub active_sessions: u64,
}

/// Durable keyed storage for session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persists a new record. Fails on a duplicate ID or on a fingerprint
    /// already mapped to a different active session.
    async fn put(&self, record: &SessionRecord) -> AppResult<()>;

    /// Fetches a record by primary key.
    async fn get_by_id(&self, id: &SessionId) -> AppResult<Option<SessionRecord>>;

    /// Fetches the active record carrying the given token fingerprint.
    async fn get_by_fingerprint(&self, fingerprint: &str) -> AppResult<Option<SessionRecord>>;

    /// Lists every record for a user, oldest first, inactive included.
    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SessionRecord>>;

    /// Replaces the stored record, keeping all indexes consistent.
    async fn update(&self, record: &SessionRecord) -> AppResult<()>;

    /// Flips a record to inactive. Returns whether it was active before.
    async fn deactivate(&self, id: &SessionId) -> AppResult<bool>;

    /// Deactivates every active record for a user. Returns the count.
    async fn deactivate_all_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    /// Counts active records for a user.
    async fn count_active_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    /// Deactivates every active record whose expiry has passed.
    /// Returns the count; running twice in a row deactivates nothing new.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64>;

    /// Aggregate counts for the stats surface.
    async fn stats(&self) -> AppResult<StoreStats>;

    /// Optional capability: user-scoped expiry cleanup.
    ///
    /// Backends that cannot sweep a single user's sessions cheaply return
    /// `None`; those users are covered by the periodic full sweep instead.
    fn user_scoped_sweep(&self) -> Option<&dyn UserScopedSweep> {
        None
    }
}

/// Capability interface for backends that support per-user expiry cleanup.
#[async_trait]
pub trait UserScopedSweep: Send + Sync {
    /// Deactivates the given user's expired active sessions.
    async fn sweep_expired_for_user(&self, user_id: Uuid, now: DateTime<Utc>) -> AppResult<u64>;
}
