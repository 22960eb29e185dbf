//! Route assembly for the gateway.

use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::{delete, get, post};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware::session_guard;
use crate::state::GatewayState;

/// Builds the gateway router: public login/refresh routes plus the
/// session-guarded self-service surface.
pub fn build_router(state: GatewayState) -> Router {
    let protected = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route(
            "/auth/sessions",
            get(handlers::list_sessions).delete(handlers::revoke_all),
        )
        .route("/auth/sessions/{id}", delete(handlers::revoke_session))
        .route("/auth/stats", get(handlers::stats))
        .route_layer(from_fn_with_state(state.clone(), session_guard));

    Router::new()
        .route("/healthz", get(handlers::healthz))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
