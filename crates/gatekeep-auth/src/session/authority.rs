//! Session lifecycle orchestration — creation, validation, refresh,
//! revocation, capping, and sweeping.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use gatekeep_core::config::session::SessionConfig;
use gatekeep_core::config::token::TokenConfig;
use gatekeep_core::error::AppError;
use gatekeep_core::result::AppResult;

use crate::token::codec::{IssuedToken, TokenCodec, TokenError};

use super::fingerprint::token_fingerprint;
use super::metrics::{MetricsSnapshot, SessionMetrics};
use super::model::{
    IdentitySnapshot, SessionId, SessionRecord, SessionSnapshot, SessionSummary,
};
use super::store::{SessionStore, StoreStats};

/// Error codes surfaced to validation and creation callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthErrorCode {
    /// No token was presented.
    MissingToken,
    /// The token failed structural or signature checks.
    InvalidToken,
    /// No session record matches the token's session ID.
    SessionNotFound,
    /// The session record exists but has been deactivated.
    SessionInactive,
    /// The session record's expiry has passed.
    SessionExpired,
    /// Persisting a new session failed.
    SessionCreationFailed,
}

impl AuthErrorCode {
    /// The wire-format code string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingToken => "missing_token",
            Self::InvalidToken => "invalid_token",
            Self::SessionNotFound => "session_not_found",
            Self::SessionInactive => "session_inactive",
            Self::SessionExpired => "session_expired",
            Self::SessionCreationFailed => "session_creation_failed",
        }
    }
}

impl std::fmt::Display for AuthErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful session creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedSession {
    /// The persisted record.
    pub record: SessionRecord,
    /// The token handed to the client.
    pub token: IssuedToken,
}

/// Result of a validation call.
///
/// Authentication-state failures are expressed through `is_valid = false`
/// plus an error code; an `Err` from [`SessionAuthority::validate`] always
/// means infrastructure failure, so edges can fail closed instead of
/// conflating outages with bad credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the token maps to a live session.
    pub is_valid: bool,
    /// Identity and session context on success.
    pub session: Option<SessionSnapshot>,
    /// Whether a rotated token is attached.
    pub should_refresh: bool,
    /// The rotated token, when rotation happened.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_token: Option<IssuedToken>,
    /// Failure code on rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AuthErrorCode>,
}

impl ValidationOutcome {
    fn rejected(code: AuthErrorCode) -> Self {
        Self {
            is_valid: false,
            session: None,
            should_refresh: false,
            new_token: None,
            error: Some(code),
        }
    }
}

/// Result of an explicit refresh call.
#[derive(Debug, Clone)]
pub enum RefreshOutcome {
    /// A rotated token was issued and persisted.
    Refreshed(IssuedToken),
    /// The token is valid but its expiry is still outside the window.
    NotYetRefreshable,
}

/// Aggregate stats for the stats surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorityStats {
    /// Store-level counts.
    pub sessions: StoreStats,
    /// Process-local lifecycle counters.
    pub counters: MetricsSnapshot,
}

/// Orchestrates the session lifecycle against a token codec and a store.
pub struct SessionAuthority {
    /// Token codec for issuance and validation.
    codec: Arc<TokenCodec>,
    /// Session persistence.
    store: Arc<dyn SessionStore>,
    /// Session policy configuration.
    session_config: SessionConfig,
    /// Token TTL configuration.
    token_config: TokenConfig,
    /// Process-local counters.
    metrics: Arc<SessionMetrics>,
}

impl std::fmt::Debug for SessionAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAuthority")
            .field("session_config", &self.session_config)
            .finish()
    }
}

impl SessionAuthority {
    /// Creates a new authority.
    pub fn new(
        codec: Arc<TokenCodec>,
        store: Arc<dyn SessionStore>,
        session_config: SessionConfig,
        token_config: TokenConfig,
    ) -> Self {
        Self {
            codec,
            store,
            session_config,
            token_config,
            metrics: Arc::new(SessionMetrics::new()),
        }
    }

    /// Creates a session for an already-authenticated identity and issues
    /// its token.
    ///
    /// Creation is atomic in effect: if persistence fails, the token is
    /// discarded and the whole call fails — a caller never observes a token
    /// without a backing record.
    pub async fn create_session(
        &self,
        identity: IdentitySnapshot,
        remember_me: bool,
        explicit_expiry: Option<DateTime<Utc>>,
    ) -> AppResult<CreatedSession> {
        let user_id = identity.user_id;

        // Best-effort cleanup of this user's own expired sessions; never
        // blocks the login path. Backends without the capability are covered
        // by the periodic full sweep.
        self.spawn_user_sweep(user_id);

        // Cap check, then evict the oldest. Check-then-act across two store
        // calls: simultaneous logins for one user can transiently admit one
        // session over the cap (see DESIGN.md).
        let cap = self.session_config.max_sessions_per_user as u64;
        let active = self.store.count_active_for_user(user_id).await?;
        if active >= cap {
            self.evict_oldest(user_id).await?;
        }

        let now = Utc::now();
        let ttl = match explicit_expiry {
            Some(expiry) => {
                if expiry <= now {
                    return Err(AppError::validation("Explicit expiry is in the past"));
                }
                expiry - now
            }
            None if remember_me => {
                Duration::hours(self.token_config.remember_me_ttl_hours as i64)
            }
            None => Duration::minutes(self.token_config.ttl_minutes as i64),
        };

        let session_id = SessionId::generate();
        let token = self.codec.issue(&identity, &session_id, ttl)?;

        let record = SessionRecord {
            id: session_id,
            user_id,
            username: identity.username,
            role_name: identity.role_name,
            permissions: identity.permissions,
            token_fingerprint: token_fingerprint(&token.token),
            created_at: now,
            expires_at: token.expires_at,
            last_activity: now,
            is_active: true,
        };

        if let Err(e) = self.store.put(&record).await {
            error!(user_id = %user_id, error = %e, "Failed to persist session, discarding token");
            return Err(AppError::session(format!(
                "{}: {e}",
                AuthErrorCode::SessionCreationFailed
            )));
        }

        self.metrics.record_created();
        info!(
            user_id = %user_id,
            session_id = %record.id,
            remember_me = remember_me,
            expires_at = %record.expires_at,
            "Session created"
        );

        Ok(CreatedSession { record, token })
    }

    /// Validates a bearer token against the session record it names.
    ///
    /// A structurally valid, correctly signed token with no matching active
    /// record is rejected — the record is the ground truth, the token only a
    /// capability.
    pub async fn validate(&self, token: &str) -> AppResult<ValidationOutcome> {
        if token.trim().is_empty() {
            self.metrics.record_rejected();
            return Ok(ValidationOutcome::rejected(AuthErrorCode::MissingToken));
        }

        // Decode failures never touch storage.
        let claims = match self.codec.decode(token) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Token rejected before store lookup");
                self.metrics.record_rejected();
                return Ok(ValidationOutcome::rejected(AuthErrorCode::InvalidToken));
            }
        };

        // Authoritative lookup by the embedded session ID.
        let session_id = claims.session_id();
        let Some(mut record) = self.store.get_by_id(&session_id).await? else {
            self.metrics.record_rejected();
            return Ok(ValidationOutcome::rejected(AuthErrorCode::SessionNotFound));
        };

        if !record.is_active {
            self.metrics.record_rejected();
            return Ok(ValidationOutcome::rejected(AuthErrorCode::SessionInactive));
        }

        let now = Utc::now();
        if record.is_expired(now) {
            if let Err(e) = self.store.deactivate(&record.id).await {
                warn!(session_id = %record.id, error = %e, "Failed to deactivate expired session");
            }
            self.metrics.record_rejected();
            return Ok(ValidationOutcome::rejected(AuthErrorCode::SessionExpired));
        }

        record.last_activity = now;

        let refresh_window = Duration::minutes(self.token_config.refresh_window_minutes as i64);
        let mut new_token = None;
        if record.expires_at - now <= refresh_window {
            match self.codec.reissue(token, refresh_window) {
                Ok(reissued) => {
                    record.token_fingerprint = token_fingerprint(&reissued.token);
                    record.expires_at = reissued.expires_at;
                    self.store.update(&record).await?;
                    self.metrics.record_refreshed();
                    info!(
                        session_id = %record.id,
                        expires_at = %record.expires_at,
                        "Token rotated"
                    );
                    new_token = Some(reissued);
                }
                Err(TokenError::NotYetRefreshable) => {
                    // Clock edge between the record check and the claim
                    // check; skip rotation this round.
                    debug!(session_id = %record.id, "Rotation skipped at window edge");
                    self.store.update(&record).await?;
                }
                Err(e) => {
                    warn!(session_id = %record.id, error = %e, "Token rotation failed");
                    self.store.update(&record).await?;
                }
            }
        } else {
            self.store.update(&record).await?;
        }

        self.metrics.record_validated();
        let should_refresh = new_token.is_some();
        Ok(ValidationOutcome {
            is_valid: true,
            session: Some(record.snapshot()),
            should_refresh,
            new_token,
            error: None,
        })
    }

    /// Explicitly rotates a token whose expiry has entered the window.
    pub async fn refresh(&self, token: &str) -> AppResult<RefreshOutcome> {
        let claims = self
            .codec
            .decode(token)
            .map_err(|e| AppError::authentication(e.to_string()))?;

        let session_id = claims.session_id();
        let Some(mut record) = self.store.get_by_id(&session_id).await? else {
            return Err(AppError::authentication(
                AuthErrorCode::SessionNotFound.as_str(),
            ));
        };
        if !record.is_active {
            return Err(AppError::authentication(
                AuthErrorCode::SessionInactive.as_str(),
            ));
        }
        let now = Utc::now();
        if record.is_expired(now) {
            if let Err(e) = self.store.deactivate(&record.id).await {
                warn!(session_id = %record.id, error = %e, "Failed to deactivate expired session");
            }
            return Err(AppError::authentication(
                AuthErrorCode::SessionExpired.as_str(),
            ));
        }

        let refresh_window = Duration::minutes(self.token_config.refresh_window_minutes as i64);
        let reissued = match self.codec.reissue(token, refresh_window) {
            Ok(reissued) => reissued,
            Err(TokenError::NotYetRefreshable) => return Ok(RefreshOutcome::NotYetRefreshable),
            Err(e) => return Err(e.into()),
        };

        record.token_fingerprint = token_fingerprint(&reissued.token);
        record.expires_at = reissued.expires_at;
        record.last_activity = now;
        self.store.update(&record).await?;

        self.metrics.record_refreshed();
        info!(session_id = %record.id, expires_at = %record.expires_at, "Token refreshed");

        Ok(RefreshOutcome::Refreshed(reissued))
    }

    /// Revokes the session owning the given token.
    ///
    /// The token is resolved to its session ID first (falling back to the
    /// fingerprint index when the claims cannot be decoded). An unknown
    /// token is not an error; revocation is idempotent.
    pub async fn revoke_token(&self, token: &str) -> AppResult<bool> {
        let session_id = match self.codec.decode(token) {
            Ok(claims) => Some(claims.session_id()),
            Err(_) => self
                .store
                .get_by_fingerprint(&token_fingerprint(token))
                .await?
                .map(|record| record.id),
        };

        let Some(session_id) = session_id else {
            return Ok(false);
        };
        self.revoke_session(&session_id).await
    }

    /// Revokes a single session by ID.
    pub async fn revoke_session(&self, session_id: &SessionId) -> AppResult<bool> {
        let revoked = self.store.deactivate(session_id).await?;
        if revoked {
            self.metrics.record_revoked(1);
            info!(session_id = %session_id, "Session revoked");
        }
        Ok(revoked)
    }

    /// Revokes every active session for a user, optionally sparing one
    /// (the caller's own). Returns the count revoked.
    pub async fn revoke_all_for_user(
        &self,
        user_id: Uuid,
        exclude: Option<&SessionId>,
    ) -> AppResult<u64> {
        let count = match exclude {
            None => self.store.deactivate_all_for_user(user_id).await?,
            Some(keep) => {
                let mut count = 0u64;
                for session in self.store.list_by_user(user_id).await? {
                    if !session.is_active || &session.id == keep {
                        continue;
                    }
                    if self.store.deactivate(&session.id).await? {
                        count += 1;
                    }
                }
                count
            }
        };

        if count > 0 {
            self.metrics.record_revoked(count);
            info!(user_id = %user_id, count = count, "User sessions revoked");
        }
        Ok(count)
    }

    /// Lists a user's active sessions, flagging the caller's own.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        current: Option<&SessionId>,
    ) -> AppResult<Vec<SessionSummary>> {
        let sessions = self.store.list_by_user(user_id).await?;
        Ok(sessions
            .into_iter()
            .filter(|s| s.is_active)
            .map(|s| SessionSummary {
                is_current: current == Some(&s.id),
                session_id: s.id,
                created_at: s.created_at,
                last_activity: s.last_activity,
                is_active: true,
            })
            .collect())
    }

    /// Deactivates every expired session regardless of owner.
    /// Invoked by the periodic sweeper; expected policy, not an error path.
    pub async fn sweep(&self) -> AppResult<u64> {
        let count = self.store.sweep_expired(Utc::now()).await?;
        if count > 0 {
            self.metrics.record_swept(count);
            info!(count = count, "Expired sessions swept");
        }
        Ok(count)
    }

    /// Store totals plus process-local counters.
    pub async fn stats(&self) -> AppResult<AuthorityStats> {
        Ok(AuthorityStats {
            sessions: self.store.stats().await?,
            counters: self.metrics.snapshot(),
        })
    }

    /// Deactivates the user's oldest active session to make room under the
    /// concurrency cap. Policy action — logged, never surfaced as an error
    /// to the caller.
    async fn evict_oldest(&self, user_id: Uuid) -> AppResult<()> {
        let sessions = self.store.list_by_user(user_id).await?;
        let Some(oldest) = sessions
            .iter()
            .filter(|s| s.is_active)
            .min_by_key(|s| s.created_at)
        else {
            return Ok(());
        };

        if self.store.deactivate(&oldest.id).await? {
            self.metrics.record_evicted();
            info!(
                user_id = %user_id,
                evicted_session = %oldest.id,
                created_at = %oldest.created_at,
                "Oldest session evicted by concurrency cap"
            );
        }
        Ok(())
    }

    /// Fires an asynchronous user-scoped sweep when the backend supports it.
    fn spawn_user_sweep(&self, user_id: Uuid) {
        if self.store.user_scoped_sweep().is_none() {
            return;
        }
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let Some(scoped) = store.user_scoped_sweep() else {
                return;
            };
            match scoped.sweep_expired_for_user(user_id, Utc::now()).await {
                Ok(count) if count > 0 => {
                    debug!(user_id = %user_id, count = count, "Pre-login sweep removed expired sessions");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Pre-login sweep failed");
                }
            }
        });
    }
}
