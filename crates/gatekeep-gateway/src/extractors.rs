//! Typed extraction of the validated session context.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use gatekeep_core::error::AppError;

use gatekeep_auth::session::SessionId;

use crate::error::ApiError;

/// Identity and session context attached by the validation middleware.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The validated session.
    pub session_id: SessionId,
    /// The authenticated user.
    pub user_id: Uuid,
    /// Username snapshot.
    pub username: String,
    /// Role snapshot.
    pub role_name: String,
    /// Permission snapshot.
    pub permissions: Vec<String>,
    /// The bearer token the request presented.
    pub token: String,
}

impl RequestContext {
    /// Whether the caller holds the administrator role.
    pub fn is_admin(&self) -> bool {
        self.role_name == "admin"
    }
}

/// Extractor handing handlers the validated session context.
///
/// Only available on routes behind [`crate::middleware::session_guard`].
#[derive(Debug, Clone)]
pub struct AuthSession(pub RequestContext);

impl std::ops::Deref for AuthSession {
    type Target = RequestContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .map(AuthSession)
            .ok_or_else(|| {
                ApiError::from(AppError::authentication("Request not session-validated"))
            })
    }
}
