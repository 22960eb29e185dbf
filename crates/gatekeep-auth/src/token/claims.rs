//! Token claims payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::session::SessionId;

/// Claims payload embedded in every issued token.
///
/// Carries the identity snapshot captured at login plus the standard
/// temporal claims. The token is a capability; the session record named by
/// `sid` remains the ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject — the user ID.
    pub sub: Uuid,
    /// Session ID this token belongs to.
    pub sid: String,
    /// Username at the time of issuance.
    pub username: String,
    /// Role at the time of issuance.
    pub role: String,
    /// Permission set at the time of issuance.
    pub permissions: Vec<String>,
    /// Issuer.
    pub iss: String,
    /// Audience.
    pub aud: String,
    /// Issued-at timestamp (seconds since epoch).
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// Returns the user ID from the subject claim.
    pub fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Returns the embedded session ID.
    pub fn session_id(&self) -> SessionId {
        SessionId::from(self.sid.clone())
    }

    /// Returns the expiration as a `DateTime<Utc>`.
    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    /// Returns the token lifetime in seconds (`exp - iat`).
    pub fn lifetime_seconds(&self) -> i64 {
        (self.exp - self.iat).max(0)
    }

    /// Checks whether this token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Returns the remaining TTL in seconds (0 if expired).
    pub fn remaining_ttl_seconds(&self) -> i64 {
        (self.exp - Utc::now().timestamp()).max(0)
    }
}
