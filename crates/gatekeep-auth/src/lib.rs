//! # gatekeep-auth
//!
//! The distributed session-authority core of Gatekeep: credential
//! verification, signed-token encoding/decoding, durable session records,
//! and the orchestration that ties them together.
//!
//! ## Modules
//!
//! - `credential` — Argon2id password hashing and verification
//! - `token` — signed token claims, encode/decode/reissue
//! - `session` — session records, store backends, authority, sweeper
//! - `identity` — identity lookup seam for the login flow

pub mod credential;
pub mod identity;
pub mod session;
pub mod token;

pub use credential::CredentialVerifier;
pub use identity::{IdentityProvider, IdentityRecord, MemoryIdentityProvider};
pub use session::{
    AuthErrorCode, CreatedSession, MemorySessionStore, PgSessionStore, RefreshOutcome,
    SessionAuthority, SessionId, SessionMetrics, SessionRecord, SessionStore, SessionSweeper,
    ValidationOutcome,
};
pub use token::{Claims, IssuedToken, TokenCodec, TokenError};
