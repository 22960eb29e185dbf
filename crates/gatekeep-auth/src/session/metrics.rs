//! Process-local session metrics.
//!
//! Counters are an observability aid only, never a correctness dependency.
//! They are owned by the authority instance rather than living in any
//! process-wide singleton.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters for session lifecycle events.
#[derive(Debug, Default)]
pub struct SessionMetrics {
    created: AtomicU64,
    validated: AtomicU64,
    rejected: AtomicU64,
    refreshed: AtomicU64,
    revoked: AtomicU64,
    evicted: AtomicU64,
    swept: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Sessions created.
    pub created: u64,
    /// Successful validations.
    pub validated: u64,
    /// Rejected validations.
    pub rejected: u64,
    /// Token rotations performed.
    pub refreshed: u64,
    /// Sessions revoked by logout or admin action.
    pub revoked: u64,
    /// Sessions evicted by the concurrency cap.
    pub evicted: u64,
    /// Sessions deactivated by sweeps.
    pub swept: u64,
}

impl SessionMetrics {
    /// Creates zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_validated(&self) {
        self.validated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refreshed(&self) {
        self.refreshed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_revoked(&self, count: u64) {
        self.revoked.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_evicted(&self) {
        self.evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_swept(&self, count: u64) {
        self.swept.fetch_add(count, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            created: self.created.load(Ordering::Relaxed),
            validated: self.validated.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            refreshed: self.refreshed.load(Ordering::Relaxed),
            revoked: self.revoked.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            swept: self.swept.load(Ordering::Relaxed),
        }
    }
}
