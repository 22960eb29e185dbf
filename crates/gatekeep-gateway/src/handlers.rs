//! HTTP handlers for the session authority surface.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use gatekeep_core::error::AppError;

use gatekeep_auth::session::{
    AuthorityStats, RefreshOutcome, SessionId, SessionSummary,
};

use crate::error::{ApiError, ApiErrorResponse};
use crate::extractors::AuthSession;
use crate::state::GatewayState;

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plaintext password.
    pub password: String,
    /// Request an extended session lifetime.
    #[serde(default)]
    pub remember_me: bool,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The issued bearer token.
    pub token: String,
    /// Token and session expiry.
    pub expires_at: DateTime<Utc>,
    /// The created session.
    pub session_id: SessionId,
    /// The authenticated user.
    pub user_id: Uuid,
    /// Username snapshot.
    pub username: String,
    /// Role snapshot.
    pub role_name: String,
    /// Permission snapshot.
    pub permissions: Vec<String>,
}

/// Exchanges credentials for a session token.
pub async fn login(
    State(state): State<GatewayState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let identity = state
        .identities
        .find_by_username(&body.username)
        .await?
        .ok_or_else(unauthorized_login)?;

    let verified = state
        .verifier
        .verify(&body.password, &identity.password_digest)
        .map_err(|e| {
            // A malformed stored digest is an operator problem; do not leak
            // it to the caller as anything other than a failed login.
            warn!(username = %body.username, error = %e, "Credential verification error");
            unauthorized_login()
        })?;

    if !verified {
        info!(username = %body.username, "Login rejected: bad credentials");
        return Err(unauthorized_login().into());
    }

    let created = state
        .authority
        .create_session(identity.snapshot(), body.remember_me, None)
        .await?;

    Ok(Json(LoginResponse {
        token: created.token.token,
        expires_at: created.token.expires_at,
        session_id: created.record.id,
        user_id: created.record.user_id,
        username: created.record.username,
        role_name: created.record.role_name,
        permissions: created.record.permissions,
    }))
}

fn unauthorized_login() -> AppError {
    AppError::authentication("Invalid username or password")
}

/// Logout response body.
#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    /// Number of sessions revoked.
    pub revoked: u64,
}

/// Revokes the caller's current session.
pub async fn logout(
    State(state): State<GatewayState>,
    session: AuthSession,
) -> Result<Json<RevokeResponse>, ApiError> {
    let revoked = state.authority.revoke_token(&session.token).await?;
    Ok(Json(RevokeResponse {
        revoked: u64::from(revoked),
    }))
}

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// The token to rotate.
    pub token: String,
}

/// Refresh response body.
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// The rotated token.
    pub token: String,
    /// New expiry.
    pub expires_at: DateTime<Utc>,
}

/// Rotates a token whose expiry has entered the refresh window.
pub async fn refresh(
    State(state): State<GatewayState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Response, ApiError> {
    match state.authority.refresh(&body.token).await? {
        RefreshOutcome::Refreshed(issued) => Ok(Json(RefreshResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        })
        .into_response()),
        RefreshOutcome::NotYetRefreshable => Ok((
            StatusCode::CONFLICT,
            Json(ApiErrorResponse {
                error: "not_yet_refreshable".to_string(),
                message: "Token expiry is still outside the refresh window".to_string(),
            }),
        )
            .into_response()),
    }
}

/// Lists the caller's active sessions, flagging the current one.
pub async fn list_sessions(
    State(state): State<GatewayState>,
    session: AuthSession,
) -> Result<Json<Vec<SessionSummary>>, ApiError> {
    let sessions = state
        .authority
        .list_for_user(session.user_id, Some(&session.session_id))
        .await?;
    Ok(Json(sessions))
}

/// Revokes one session by ID. Callers may revoke their own sessions;
/// administrators may revoke anyone's.
pub async fn revoke_session(
    State(state): State<GatewayState>,
    session: AuthSession,
    Path(id): Path<String>,
) -> Result<Json<RevokeResponse>, ApiError> {
    let target = SessionId::from(id);

    if !session.is_admin() {
        let owned = state
            .authority
            .list_for_user(session.user_id, None)
            .await?
            .iter()
            .any(|s| s.session_id == target);
        if !owned {
            return Err(AppError::authorization("Cannot revoke another user's session").into());
        }
    }

    let revoked = state.authority.revoke_session(&target).await?;
    Ok(Json(RevokeResponse {
        revoked: u64::from(revoked),
    }))
}

/// Query parameters for bulk revocation.
#[derive(Debug, Deserialize)]
pub struct RevokeAllParams {
    /// Keep the caller's current session alive (default true).
    #[serde(default = "default_exclude_current")]
    pub exclude_current: bool,
}

fn default_exclude_current() -> bool {
    true
}

/// Revokes every active session of the caller.
pub async fn revoke_all(
    State(state): State<GatewayState>,
    session: AuthSession,
    Query(params): Query<RevokeAllParams>,
) -> Result<Json<RevokeResponse>, ApiError> {
    let exclude = params.exclude_current.then_some(&session.session_id);
    let revoked = state
        .authority
        .revoke_all_for_user(session.user_id, exclude)
        .await?;
    Ok(Json(RevokeResponse { revoked }))
}

/// Session totals and lifecycle counters. Administrators only.
pub async fn stats(
    State(state): State<GatewayState>,
    session: AuthSession,
) -> Result<Json<AuthorityStats>, ApiError> {
    if !session.is_admin() {
        return Err(AppError::authorization("Stats require the admin role").into());
    }
    Ok(Json(state.authority.stats().await?))
}

/// Liveness probe.
pub async fn healthz() -> &'static str {
    "ok"
}
