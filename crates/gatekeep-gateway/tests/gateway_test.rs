//! Integration tests for the gateway surface and validation middleware.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use gatekeep_core::config::credential::CredentialConfig;
use gatekeep_core::config::session::SessionConfig;
use gatekeep_core::config::token::TokenConfig;

use gatekeep_auth::credential::CredentialVerifier;
use gatekeep_auth::identity::{IdentityRecord, MemoryIdentityProvider};
use gatekeep_auth::session::{MemorySessionStore, SessionAuthority, SessionStore};
use gatekeep_auth::token::TokenCodec;

use gatekeep_gateway::middleware::session_guard;
use gatekeep_gateway::{GatewayState, build_router, headers};

struct TestGateway {
    state: GatewayState,
    router: Router,
    authority: Arc<SessionAuthority>,
}

impl TestGateway {
    async fn new() -> Self {
        let token_config = TokenConfig {
            secret: "gateway-test-secret".to_string(),
            ..TokenConfig::default()
        };
        let session_config = SessionConfig::default();

        let store = Arc::new(MemorySessionStore::new(64));
        let codec = Arc::new(TokenCodec::new(&token_config));
        let authority = Arc::new(SessionAuthority::new(
            codec,
            store as Arc<dyn SessionStore>,
            session_config,
            token_config,
        ));

        // Cheap cost parameters to keep the suite fast.
        let verifier = Arc::new(
            CredentialVerifier::new(&CredentialConfig {
                memory_cost_kib: 1024,
                time_cost: 1,
                parallelism: 1,
            })
            .unwrap(),
        );

        let identities = Arc::new(MemoryIdentityProvider::new());
        identities
            .register(IdentityRecord {
                user_id: Uuid::new_v4(),
                username: "ada".to_string(),
                role_name: "operator".to_string(),
                permissions: vec!["orders:read".to_string()],
                password_digest: verifier.hash("correct-password").unwrap(),
            })
            .await;
        identities
            .register(IdentityRecord {
                user_id: Uuid::new_v4(),
                username: "root".to_string(),
                role_name: "admin".to_string(),
                permissions: vec!["sessions:manage".to_string()],
                password_digest: verifier.hash("admin-password").unwrap(),
            })
            .await;

        let state = GatewayState::new(Arc::clone(&authority), verifier, identities);
        let router = build_router(state.clone());

        Self {
            state,
            router,
            authority,
        }
    }

    async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value, axum::http::HeaderMap) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body, headers)
    }

    async fn login(&self, username: &str, password: &str) -> String {
        let (status, body, _) = self
            .request(
                "POST",
                "/auth/login",
                Some(json!({"username": username, "password": password})),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn login_returns_a_token() {
    let gw = TestGateway::new().await;
    let (status, body, _) = gw
        .request(
            "POST",
            "/auth/login",
            Some(json!({"username": "ada", "password": "correct-password"})),
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
    assert_eq!(body["username"], "ada");
    assert_eq!(body["role_name"], "operator");
}

#[tokio::test]
async fn login_with_bad_password_is_uniformly_rejected() {
    let gw = TestGateway::new().await;
    let (status, body, _) = gw
        .request(
            "POST",
            "/auth/login",
            Some(json!({"username": "ada", "password": "wrong"})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (unknown_status, unknown_body, _) = gw
        .request(
            "POST",
            "/auth/login",
            Some(json!({"username": "nobody", "password": "wrong"})),
            None,
        )
        .await;
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    // Unknown user and bad password are indistinguishable to the caller.
    assert_eq!(body["error"], unknown_body["error"]);
}

#[tokio::test]
async fn protected_route_requires_a_token() {
    let gw = TestGateway::new().await;

    let (status, body, _) = gw.request("GET", "/auth/sessions", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_token");

    let (status, body, _) = gw
        .request("GET", "/auth/sessions", None, Some("garbage"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn session_listing_flags_the_current_session() {
    let gw = TestGateway::new().await;
    let _other = gw.login("ada", "correct-password").await;
    let token = gw.login("ada", "correct-password").await;

    let (status, body, _) = gw
        .request("GET", "/auth/sessions", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);

    let sessions = body.as_array().unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(
        sessions
            .iter()
            .filter(|s| s["is_current"] == json!(true))
            .count(),
        1
    );
}

#[tokio::test]
async fn logout_invalidates_the_token() {
    let gw = TestGateway::new().await;
    let token = gw.login("ada", "correct-password").await;

    let (status, body, _) = gw.request("POST", "/auth/logout", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], 1);

    let (status, body, _) = gw
        .request("GET", "/auth/sessions", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "session_inactive");
}

#[tokio::test]
async fn refresh_outside_the_window_is_gated() {
    let gw = TestGateway::new().await;
    let token = gw.login("ada", "correct-password").await;

    let (status, body, _) = gw
        .request("POST", "/auth/refresh", Some(json!({"token": token})), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_yet_refreshable");
}

#[tokio::test]
async fn refresh_inside_the_window_rotates() {
    let gw = TestGateway::new().await;

    let created = gw
        .authority
        .create_session(
            gatekeep_auth::session::IdentitySnapshot {
                user_id: Uuid::new_v4(),
                username: "short".to_string(),
                role_name: "operator".to_string(),
                permissions: vec![],
            },
            false,
            Some(Utc::now() + Duration::minutes(4)),
        )
        .await
        .unwrap();

    let (status, body, _) = gw
        .request(
            "POST",
            "/auth/refresh",
            Some(json!({"token": created.token.token})),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some());
    assert_ne!(body["token"].as_str().unwrap(), created.token.token);
}

#[tokio::test]
async fn stats_require_the_admin_role() {
    let gw = TestGateway::new().await;

    let operator = gw.login("ada", "correct-password").await;
    let (status, _, _) = gw.request("GET", "/auth/stats", None, Some(&operator)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = gw.login("root", "admin-password").await;
    let (status, body, _) = gw.request("GET", "/auth/stats", None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["sessions"]["active_sessions"].as_u64().unwrap() >= 2);
    assert!(body["counters"]["created"].as_u64().unwrap() >= 2);
}

#[tokio::test]
async fn operators_cannot_revoke_foreign_sessions() {
    let gw = TestGateway::new().await;
    let admin_token = gw.login("root", "admin-password").await;
    let operator_token = gw.login("ada", "correct-password").await;

    // Find the admin's session ID via its own listing.
    let (_, admin_sessions, _) = gw
        .request("GET", "/auth/sessions", None, Some(&admin_token))
        .await;
    let admin_session_id = admin_sessions[0]["session_id"].as_str().unwrap().to_string();

    let (status, _, _) = gw
        .request(
            "DELETE",
            &format!("/auth/sessions/{admin_session_id}"),
            None,
            Some(&operator_token),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Admins can revoke anyone's.
    let (_, operator_sessions, _) = gw
        .request("GET", "/auth/sessions", None, Some(&operator_token))
        .await;
    let operator_session_id = operator_sessions[0]["session_id"]
        .as_str()
        .unwrap()
        .to_string();
    let (status, body, _) = gw
        .request(
            "DELETE",
            &format!("/auth/sessions/{operator_session_id}"),
            None,
            Some(&admin_token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["revoked"], 1);
}

/// Echoes the identity headers the middleware injected.
async fn echo_identity(request: Request<Body>) -> axum::Json<Value> {
    let headers = request.headers();
    let pick = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    axum::Json(json!({
        "user_id": pick(headers::USER_ID),
        "username": pick(headers::USERNAME),
        "role": pick(headers::ROLE),
        "permissions": pick(headers::PERMISSIONS),
        "validated": pick(headers::VALIDATED),
    }))
}

fn forwarding_router(state: GatewayState) -> Router {
    Router::new()
        .route("/downstream", get(echo_identity))
        .route_layer(from_fn_with_state(state.clone(), session_guard))
        .with_state(state)
}

#[tokio::test]
async fn forwarded_requests_carry_identity_headers() {
    let gw = TestGateway::new().await;
    let token = gw.login("ada", "correct-password").await;
    let router = forwarding_router(gw.state.clone());

    // Smuggled identity headers must be overwritten by the middleware.
    let request = Request::builder()
        .method("GET")
        .uri("/downstream")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(headers::ROLE, "admin")
        .header(headers::VALIDATED, "1")
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body["username"], "ada");
    assert_eq!(body["role"], "operator");
    assert_eq!(body["permissions"], "orders:read");
    assert_eq!(body["validated"], "1");
    assert!(!body["user_id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn rotated_token_is_surfaced_on_the_response() {
    let gw = TestGateway::new().await;

    let created = gw
        .authority
        .create_session(
            gatekeep_auth::session::IdentitySnapshot {
                user_id: Uuid::new_v4(),
                username: "rotating".to_string(),
                role_name: "operator".to_string(),
                permissions: vec![],
            },
            false,
            Some(Utc::now() + Duration::minutes(4)),
        )
        .await
        .unwrap();

    let router = forwarding_router(gw.state.clone());
    let request = Request::builder()
        .method("GET")
        .uri("/downstream")
        .header(
            header::AUTHORIZATION,
            format!("Bearer {}", created.token.token),
        )
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let rotated = response
        .headers()
        .get(headers::REFRESHED_TOKEN)
        .expect("rotated token header attached")
        .to_str()
        .unwrap();
    assert_ne!(rotated, created.token.token);

    // The rotated token is immediately usable.
    let outcome = gw.authority.validate(rotated).await.unwrap();
    assert!(outcome.is_valid);
}

#[tokio::test]
async fn healthz_is_public() {
    let gw = TestGateway::new().await;
    let (status, _, _) = gw.request("GET", "/healthz", None, None).await;
    assert_eq!(status, StatusCode::OK);
}
