//! Session management configuration.

use serde::{Deserialize, Serialize};

/// Session management configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Which session store backend to use.
    #[serde(default)]
    pub backend: SessionBackend,
    /// Maximum number of simultaneously active sessions per user.
    #[serde(default = "default_max_per_user")]
    pub max_sessions_per_user: u32,
    /// Interval between expired-session sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,
    /// Number of sessions deactivated per write batch during a sweep.
    #[serde(default = "default_sweep_batch")]
    pub sweep_batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            max_sessions_per_user: default_max_per_user(),
            sweep_interval_seconds: default_sweep_interval(),
            sweep_batch_size: default_sweep_batch(),
        }
    }
}

/// Session store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionBackend {
    /// Single-node in-memory store.
    #[default]
    Memory,
    /// PostgreSQL-backed store.
    Postgres,
}

impl std::fmt::Display for SessionBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionBackend::Memory => write!(f, "memory"),
            SessionBackend::Postgres => write!(f, "postgres"),
        }
    }
}

fn default_max_per_user() -> u32 {
    5
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_sweep_batch() -> usize {
    256
}
