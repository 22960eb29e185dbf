//! Token signing and lifetime configuration.

use serde::{Deserialize, Serialize};

/// Token codec configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Secret key for token signing (HMAC-SHA256).
    #[serde(default = "default_secret")]
    pub secret: String,
    /// Issuer claim stamped into every token.
    #[serde(default = "default_issuer")]
    pub issuer: String,
    /// Audience claim stamped into every token.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Default token TTL in minutes.
    #[serde(default = "default_ttl")]
    pub ttl_minutes: u64,
    /// Extended TTL in hours for "remember me" sessions.
    #[serde(default = "default_remember_me_ttl")]
    pub remember_me_ttl_hours: u64,
    /// Time-before-expiry window in minutes inside which a valid token is
    /// proactively reissued.
    #[serde(default = "default_refresh_window")]
    pub refresh_window_minutes: u64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: default_secret(),
            issuer: default_issuer(),
            audience: default_audience(),
            ttl_minutes: default_ttl(),
            remember_me_ttl_hours: default_remember_me_ttl(),
            refresh_window_minutes: default_refresh_window(),
        }
    }
}

fn default_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_issuer() -> String {
    "gatekeep".to_string()
}

fn default_audience() -> String {
    "gatekeep-services".to_string()
}

fn default_ttl() -> u64 {
    30
}

fn default_remember_me_ttl() -> u64 {
    720
}

fn default_refresh_window() -> u64 {
    5
}
