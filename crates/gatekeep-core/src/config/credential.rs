//! Credential hashing configuration.

use serde::{Deserialize, Serialize};

/// Argon2id cost parameters for password hashing.
///
/// The cost is embedded in every produced digest, so verification succeeds
/// against digests produced under any cost configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialConfig {
    /// Memory cost in KiB.
    #[serde(default = "default_memory_cost")]
    pub memory_cost_kib: u32,
    /// Number of iterations.
    #[serde(default = "default_time_cost")]
    pub time_cost: u32,
    /// Degree of parallelism.
    #[serde(default = "default_parallelism")]
    pub parallelism: u32,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            memory_cost_kib: default_memory_cost(),
            time_cost: default_time_cost(),
            parallelism: default_parallelism(),
        }
    }
}

fn default_memory_cost() -> u32 {
    19456
}

fn default_time_cost() -> u32 {
    2
}

fn default_parallelism() -> u32 {
    1
}
