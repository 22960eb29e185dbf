//! Session record and identity snapshot types.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque, high-entropy session identifier (256 bits, hex-encoded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a fresh identifier from 32 bytes of CSPRNG output.
    pub fn generate() -> Self {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity captured at login time.
///
/// This snapshot is embedded in tokens and session records and is **not**
/// re-derived from a live user record on validation; role or permission
/// changes take effect only on new session issuance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentitySnapshot {
    /// The user this identity belongs to.
    pub user_id: Uuid,
    /// Username at login time.
    pub username: String,
    /// Role name at login time.
    pub role_name: String,
    /// Permission set at login time (order-irrelevant).
    pub permissions: Vec<String>,
}

/// Server-side ground truth for one authenticated client session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Primary key.
    pub id: SessionId,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// Username snapshot.
    pub username: String,
    /// Role snapshot.
    pub role_name: String,
    /// Permission snapshot.
    pub permissions: Vec<String>,
    /// SHA-256 digest of the currently valid token. Rotates on refresh;
    /// at most one active session maps to a given fingerprint.
    pub token_fingerprint: String,
    /// When the session was created (login time), UTC.
    pub created_at: DateTime<Utc>,
    /// When the session expires, UTC.
    pub expires_at: DateTime<Utc>,
    /// Last successful validation, UTC.
    pub last_activity: DateTime<Utc>,
    /// False means logically deleted — revoked, swept, or evicted.
    /// Never transitions back to true.
    pub is_active: bool,
}

impl SessionRecord {
    /// Check whether the session has expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Returns the identity snapshot carried by this record.
    pub fn identity(&self) -> IdentitySnapshot {
        IdentitySnapshot {
            user_id: self.user_id,
            username: self.username.clone(),
            role_name: self.role_name.clone(),
            permissions: self.permissions.clone(),
        }
    }

    /// Returns the snapshot handed to validation callers.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            user_id: self.user_id,
            username: self.username.clone(),
            role_name: self.role_name.clone(),
            permissions: self.permissions.clone(),
            expires_at: self.expires_at,
        }
    }
}

/// Identity and session context returned by a successful validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// The validated session.
    pub session_id: SessionId,
    /// The user this session belongs to.
    pub user_id: Uuid,
    /// Username snapshot.
    pub username: String,
    /// Role snapshot.
    pub role_name: String,
    /// Permission snapshot.
    pub permissions: Vec<String>,
    /// Current session expiry.
    pub expires_at: DateTime<Utc>,
}

/// Entry in a user's self-service session listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// The session identifier.
    pub session_id: SessionId,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last successful validation.
    pub last_activity: DateTime<Utc>,
    /// Whether the session is active.
    pub is_active: bool,
    /// Whether this is the caller's own current session.
    pub is_current: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_256_bit_and_unique() {
        let a = SessionId::generate();
        let b = SessionId::generate();
        assert_eq!(a.as_str().len(), 64);
        assert_ne!(a, b);
    }
}
