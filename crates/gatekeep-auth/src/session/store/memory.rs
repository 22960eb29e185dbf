//! In-memory session store for single-node deployments.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use gatekeep_core::error::AppError;
use gatekeep_core::result::AppResult;

use crate::session::model::{SessionId, SessionRecord};

use super::{SessionStore, StoreStats, UserScopedSweep};

/// Primary records plus the secondary indexes, mutated together under one
/// write lock so they can never diverge.
#[derive(Debug, Default)]
struct Indexes {
    /// Primary records keyed by session ID.
    by_id: HashMap<String, SessionRecord>,
    /// Active-session fingerprint index: fingerprint -> session ID.
    by_fingerprint: HashMap<String, String>,
    /// Session IDs per owning user.
    by_user: HashMap<Uuid, HashSet<String>>,
}

impl Indexes {
    /// Drops the fingerprint entry pointing at the given session, if any.
    fn unlink_fingerprint(&mut self, fingerprint: &str, id: &str) {
        if self.by_fingerprint.get(fingerprint).map(String::as_str) == Some(id) {
            self.by_fingerprint.remove(fingerprint);
        }
    }

    /// Flips a record inactive and removes it from the fingerprint index.
    /// Returns whether it was active before.
    fn deactivate(&mut self, id: &str) -> bool {
        let Some(record) = self.by_id.get_mut(id) else {
            return false;
        };
        if !record.is_active {
            return false;
        }
        record.is_active = false;
        let fingerprint = record.token_fingerprint.clone();
        self.unlink_fingerprint(&fingerprint, id);
        true
    }
}

/// Single-node in-memory backend guarded by one reader/writer lock.
#[derive(Debug)]
pub struct MemorySessionStore {
    inner: RwLock<Indexes>,
    /// Sessions deactivated per write batch during a sweep.
    sweep_batch_size: usize,
}

impl MemorySessionStore {
    /// Creates an empty store.
    pub fn new(sweep_batch_size: usize) -> Self {
        Self {
            inner: RwLock::new(Indexes::default()),
            sweep_batch_size: sweep_batch_size.max(1),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn put(&self, record: &SessionRecord) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        let id = record.id.as_str().to_string();
        if inner.by_id.contains_key(&id) {
            return Err(AppError::conflict(format!("Session {id} already exists")));
        }
        if record.is_active && inner.by_fingerprint.contains_key(&record.token_fingerprint) {
            return Err(AppError::conflict(
                "Token fingerprint already mapped to an active session",
            ));
        }

        if record.is_active {
            inner
                .by_fingerprint
                .insert(record.token_fingerprint.clone(), id.clone());
        }
        inner
            .by_user
            .entry(record.user_id)
            .or_default()
            .insert(id.clone());
        inner.by_id.insert(id, record.clone());

        Ok(())
    }

    async fn get_by_id(&self, id: &SessionId) -> AppResult<Option<SessionRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.by_id.get(id.as_str()).cloned())
    }

    async fn get_by_fingerprint(&self, fingerprint: &str) -> AppResult<Option<SessionRecord>> {
        let inner = self.inner.read().await;
        let Some(id) = inner.by_fingerprint.get(fingerprint) else {
            return Ok(None);
        };
        Ok(inner.by_id.get(id).cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SessionRecord>> {
        let inner = self.inner.read().await;
        let mut sessions: Vec<SessionRecord> = inner
            .by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.by_id.get(id))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.created_at);
        Ok(sessions)
    }

    async fn update(&self, record: &SessionRecord) -> AppResult<()> {
        let mut inner = self.inner.write().await;

        let id = record.id.as_str().to_string();
        let Some(existing) = inner.by_id.get(&id) else {
            return Err(AppError::not_found(format!("Session {id} not found")));
        };

        let old_fingerprint = existing.token_fingerprint.clone();
        if old_fingerprint != record.token_fingerprint {
            if record.is_active && inner.by_fingerprint.contains_key(&record.token_fingerprint) {
                return Err(AppError::conflict(
                    "Token fingerprint already mapped to an active session",
                ));
            }
            inner.unlink_fingerprint(&old_fingerprint, &id);
        }

        if record.is_active {
            inner
                .by_fingerprint
                .insert(record.token_fingerprint.clone(), id.clone());
        } else {
            inner.unlink_fingerprint(&record.token_fingerprint, &id);
        }
        inner.by_id.insert(id, record.clone());

        Ok(())
    }

    async fn deactivate(&self, id: &SessionId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.deactivate(id.as_str()))
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let ids: Vec<String> = inner
            .by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .cloned()
            .collect();

        let mut count = 0u64;
        for id in ids {
            if inner.deactivate(&id) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn count_active_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let inner = self.inner.read().await;
        let count = inner
            .by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.by_id.get(id))
            .filter(|s| s.is_active)
            .count();
        Ok(count as u64)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        // Candidates are collected under a read lock, then deactivated in
        // small write-lock batches so concurrent validations are not starved
        // for the duration of a full scan.
        let candidates: Vec<String> = {
            let inner = self.inner.read().await;
            inner
                .by_id
                .values()
                .filter(|s| s.is_active && s.is_expired(now))
                .map(|s| s.id.as_str().to_string())
                .collect()
        };

        let mut count = 0u64;
        for batch in candidates.chunks(self.sweep_batch_size) {
            let mut inner = self.inner.write().await;
            for id in batch {
                // Re-check under the write lock; a concurrent validate or
                // revoke may have raced us.
                let still_expired = inner
                    .by_id
                    .get(id.as_str())
                    .is_some_and(|s| s.is_active && s.is_expired(now));
                if still_expired && inner.deactivate(id) {
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    async fn stats(&self) -> AppResult<StoreStats> {
        let inner = self.inner.read().await;
        let total = inner.by_id.len() as u64;
        let active = inner.by_id.values().filter(|s| s.is_active).count() as u64;
        Ok(StoreStats {
            total_sessions: total,
            active_sessions: active,
        })
    }

    fn user_scoped_sweep(&self) -> Option<&dyn UserScopedSweep> {
        Some(self)
    }
}

#[async_trait]
impl UserScopedSweep for MemorySessionStore {
    async fn sweep_expired_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let expired: Vec<String> = inner
            .by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.by_id.get(id))
            .filter(|s| s.is_active && s.is_expired(now))
            .map(|s| s.id.as_str().to_string())
            .collect();

        let mut count = 0u64;
        for id in expired {
            if inner.deactivate(&id) {
                count += 1;
            } else {
                warn!(session_id = %id, "Expired session vanished during user-scoped sweep");
            }
        }
        Ok(count)
    }
}
