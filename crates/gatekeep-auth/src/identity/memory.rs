//! In-memory identity provider for single-node deployments and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use gatekeep_core::result::AppResult;

use super::{IdentityProvider, IdentityRecord};

/// Identity records held in memory, keyed by username.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    records: RwLock<HashMap<String, IdentityRecord>>,
}

impl MemoryIdentityProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) an identity record.
    pub async fn register(&self, record: IdentityRecord) {
        let mut records = self.records.write().await;
        records.insert(record.username.clone(), record);
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn find_by_username(&self, username: &str) -> AppResult<Option<IdentityRecord>> {
        let records = self.records.read().await;
        Ok(records.get(username).cloned())
    }
}
