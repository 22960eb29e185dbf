//! Session records, store backends, and lifecycle orchestration.

pub mod authority;
pub mod fingerprint;
pub mod metrics;
pub mod model;
pub mod store;
pub mod sweeper;

pub use authority::{
    AuthErrorCode, AuthorityStats, CreatedSession, RefreshOutcome, SessionAuthority,
    ValidationOutcome,
};
pub use fingerprint::token_fingerprint;
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use model::{IdentitySnapshot, SessionId, SessionRecord, SessionSnapshot, SessionSummary};
pub use store::memory::MemorySessionStore;
pub use store::postgres::PgSessionStore;
pub use store::{SessionStore, StoreStats, UserScopedSweep};
pub use sweeper::SessionSweeper;
