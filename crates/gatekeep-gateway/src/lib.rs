//! # gatekeep-gateway
//!
//! The edge of the session-authority subsystem: per-request validation
//! middleware that rejects unauthenticated traffic and annotates forwarded
//! requests with identity headers, plus the HTTP surface for session
//! lifecycle operations (login, logout, refresh, self-service management).

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod headers;
pub mod middleware;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use extractors::{AuthSession, RequestContext};
pub use middleware::session_guard;
pub use router::build_router;
pub use state::GatewayState;
