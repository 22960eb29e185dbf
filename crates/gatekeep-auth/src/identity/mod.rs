//! Identity lookup seam for the login flow.
//!
//! Gatekeep does not own user persistence; an [`IdentityProvider`] hands the
//! login flow a stored credential digest plus the identity snapshot to embed
//! in the session.

pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use gatekeep_core::result::AppResult;

use crate::session::model::IdentitySnapshot;

pub use memory::MemoryIdentityProvider;

/// A stored identity: login snapshot plus credential digest.
#[derive(Debug, Clone)]
pub struct IdentityRecord {
    /// Stable user identifier.
    pub user_id: Uuid,
    /// Login name.
    pub username: String,
    /// Assigned role.
    pub role_name: String,
    /// Granted permissions.
    pub permissions: Vec<String>,
    /// Argon2id digest of the password.
    pub password_digest: String,
}

impl IdentityRecord {
    /// The snapshot embedded into sessions and tokens at login.
    pub fn snapshot(&self) -> IdentitySnapshot {
        IdentitySnapshot {
            user_id: self.user_id,
            username: self.username.clone(),
            role_name: self.role_name.clone(),
            permissions: self.permissions.clone(),
        }
    }
}

/// Resolves usernames to stored identity records.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Looks up an identity by username.
    async fn find_by_username(&self, username: &str) -> AppResult<Option<IdentityRecord>>;
}
