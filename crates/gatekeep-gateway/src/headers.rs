//! Identity headers injected into forwarded requests.
//!
//! Downstream services trust these headers instead of re-parsing tokens;
//! the middleware strips any inbound copies before validation so a client
//! can never smuggle its own.

use axum::http::{HeaderMap, HeaderValue};
use tracing::warn;

use gatekeep_auth::session::SessionSnapshot;

/// Forwarded user ID.
pub const USER_ID: &str = "x-auth-user-id";
/// Forwarded username.
pub const USERNAME: &str = "x-auth-username";
/// Forwarded role name.
pub const ROLE: &str = "x-auth-role";
/// Forwarded permission list, comma-separated.
pub const PERMISSIONS: &str = "x-auth-permissions";
/// Forwarded session ID.
pub const SESSION_ID: &str = "x-auth-session-id";
/// Marker identifying the request as already session-validated.
pub const VALIDATED: &str = "x-auth-validated";
/// Response header carrying a rotated token back to the caller.
pub const REFRESHED_TOKEN: &str = "x-auth-refreshed-token";

/// Every request header the gateway owns.
pub const IDENTITY_HEADERS: &[&str] = &[
    USER_ID, USERNAME, ROLE, PERMISSIONS, SESSION_ID, VALIDATED,
];

/// Removes all gateway-owned identity headers.
pub fn strip_identity_headers(headers: &mut HeaderMap) {
    for name in IDENTITY_HEADERS {
        headers.remove(*name);
    }
}

/// Injects identity headers derived from a validated session snapshot.
pub fn inject_identity_headers(headers: &mut HeaderMap, snapshot: &SessionSnapshot) {
    headers.insert(USER_ID, header_value(&snapshot.user_id.to_string()));
    headers.insert(USERNAME, header_value(&snapshot.username));
    headers.insert(ROLE, header_value(&snapshot.role_name));
    headers.insert(PERMISSIONS, header_value(&snapshot.permissions.join(",")));
    headers.insert(SESSION_ID, header_value(snapshot.session_id.as_str()));
    headers.insert(VALIDATED, HeaderValue::from_static("1"));
}

/// Builds a header value, dropping characters HTTP cannot carry.
fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| {
        warn!(value = %value, "Identity value not header-safe, forwarding sanitized form");
        let sanitized: String = value
            .chars()
            .filter(|c| c.is_ascii() && !c.is_ascii_control())
            .collect();
        HeaderValue::from_str(&sanitized).unwrap_or_else(|_| HeaderValue::from_static(""))
    })
}

/// Extracts the bearer token from an Authorization header, if present.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
