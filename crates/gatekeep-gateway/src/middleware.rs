//! Per-request session validation middleware.

use axum::Json;
use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use tracing::{error, warn};

use gatekeep_auth::session::AuthErrorCode;

use crate::error::ApiErrorResponse;
use crate::extractors::RequestContext;
use crate::headers;
use crate::state::GatewayState;

/// Validates the bearer token against the session authority before letting
/// the request through.
///
/// On success the forwarded request carries identity headers derived from
/// the session snapshot; when the token was rotated, the response carries
/// the new token in [`headers::REFRESHED_TOKEN`] so the client can update
/// its state without a second round trip. Store failures are surfaced as
/// 503, never as an anonymous pass-through.
pub async fn session_guard(
    State(state): State<GatewayState>,
    mut request: Request,
    next: Next,
) -> Response {
    // A client must never smuggle its own identity headers past the edge.
    headers::strip_identity_headers(request.headers_mut());

    let token = headers::bearer_token(request.headers())
        .unwrap_or_default()
        .to_string();

    let outcome = match state.authority.validate(&token).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!(error = %e, "Session validation unavailable, failing closed");
            return backend_unavailable();
        }
    };

    let is_valid = outcome.is_valid;
    let Some(snapshot) = outcome.session.filter(|_| is_valid) else {
        let code = outcome.error.unwrap_or(AuthErrorCode::InvalidToken);
        return unauthorized(code);
    };

    headers::inject_identity_headers(request.headers_mut(), &snapshot);
    request.extensions_mut().insert(RequestContext {
        session_id: snapshot.session_id.clone(),
        user_id: snapshot.user_id,
        username: snapshot.username.clone(),
        role_name: snapshot.role_name.clone(),
        permissions: snapshot.permissions.clone(),
        token,
    });

    let mut response = next.run(request).await;

    if let Some(rotated) = outcome.new_token {
        match HeaderValue::from_str(&rotated.token) {
            Ok(value) => {
                response
                    .headers_mut()
                    .insert(headers::REFRESHED_TOKEN, value);
            }
            Err(e) => {
                warn!(error = %e, "Rotated token not header-safe, dropping from response");
            }
        }
    }

    response
}

/// Uniform "not authenticated" rejection with an internal diagnostic code.
fn unauthorized(code: AuthErrorCode) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiErrorResponse {
            error: code.as_str().to_string(),
            message: "Not authenticated".to_string(),
        }),
    )
        .into_response()
}

/// Fail-closed rejection for infrastructure failures.
fn backend_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ApiErrorResponse {
            error: "backend_unavailable".to_string(),
            message: "Session validation is temporarily unavailable".to_string(),
        }),
    )
        .into_response()
}
