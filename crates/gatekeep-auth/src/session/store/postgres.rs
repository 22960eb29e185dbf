//! PostgreSQL-backed session store.
//!
//! Every mutation is a single statement; per-row atomicity of those
//! statements is what keeps the record and its indexed columns consistent.
//! The cap-eviction path therefore carries a weaker cross-call guarantee
//! than the in-memory backend — an accepted property, not a bug.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::prelude::FromRow;
use tracing::info;
use uuid::Uuid;

use gatekeep_core::config::DatabaseConfig;
use gatekeep_core::error::{AppError, ErrorKind};
use gatekeep_core::result::AppResult;

use crate::session::model::{SessionId, SessionRecord};

use super::{SessionStore, StoreStats, UserScopedSweep};

/// Schema for the sessions table. The partial unique index enforces the
/// one-active-session-per-fingerprint invariant at the storage layer.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id                TEXT PRIMARY KEY,
    user_id           UUID NOT NULL,
    username          TEXT NOT NULL,
    role_name         TEXT NOT NULL,
    permissions       TEXT[] NOT NULL,
    token_fingerprint TEXT NOT NULL,
    created_at        TIMESTAMPTZ NOT NULL,
    expires_at        TIMESTAMPTZ NOT NULL,
    last_activity     TIMESTAMPTZ NOT NULL,
    is_active         BOOLEAN NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS sessions_active_fingerprint
    ON sessions (token_fingerprint) WHERE is_active;
CREATE INDEX IF NOT EXISTS sessions_user ON sessions (user_id);
CREATE INDEX IF NOT EXISTS sessions_active_expiry
    ON sessions (expires_at) WHERE is_active;
"#;

/// Row shape fetched from the sessions table.
#[derive(Debug, FromRow)]
struct SessionRow {
    id: String,
    user_id: Uuid,
    username: String,
    role_name: String,
    permissions: Vec<String>,
    token_fingerprint: String,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    is_active: bool,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            id: SessionId::from(row.id),
            user_id: row.user_id,
            username: row.username,
            role_name: row.role_name,
            permissions: row.permissions,
            token_fingerprint: row.token_fingerprint,
            created_at: row.created_at,
            expires_at: row.expires_at,
            last_activity: row.last_activity,
            is_active: row.is_active,
        }
    }
}

/// PostgreSQL session store.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    /// Wraps an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connects a new pool from configuration and ensures the schema exists.
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        info!(
            url = %mask_password(&config.url),
            max_connections = config.max_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .connect(&config.url)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to connect to database: {e}"),
                    e,
                )
            })?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Creates the sessions table and indexes if absent.
    pub async fn ensure_schema(&self) -> AppResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to ensure session schema", e)
            })?;
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn put(&self, record: &SessionRecord) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO sessions \
             (id, user_id, username, role_name, permissions, token_fingerprint, \
              created_at, expires_at, last_activity, is_active) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(record.id.as_str())
        .bind(record.user_id)
        .bind(&record.username)
        .bind(&record.role_name)
        .bind(&record.permissions)
        .bind(&record.token_fingerprint)
        .bind(record.created_at)
        .bind(record.expires_at)
        .bind(record.last_activity)
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                AppError::conflict("Session ID or active fingerprint already exists")
            }
            _ => AppError::with_source(ErrorKind::Database, "Failed to create session", e),
        })?;
        Ok(())
    }

    async fn get_by_id(&self, id: &SessionId) -> AppResult<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find session", e)
            })?;
        Ok(row.map(SessionRecord::from))
    }

    async fn get_by_fingerprint(&self, fingerprint: &str) -> AppResult<Option<SessionRecord>> {
        let row = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions WHERE token_fingerprint = $1 AND is_active",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to find session by fingerprint", e)
        })?;
        Ok(row.map(SessionRecord::from))
    }

    async fn list_by_user(&self, user_id: Uuid) -> AppResult<Vec<SessionRecord>> {
        let rows = sqlx::query_as::<_, SessionRow>(
            "SELECT * FROM sessions WHERE user_id = $1 ORDER BY created_at ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to list user sessions", e)
        })?;
        Ok(rows.into_iter().map(SessionRecord::from).collect())
    }

    async fn update(&self, record: &SessionRecord) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE sessions SET token_fingerprint = $2, expires_at = $3, \
             last_activity = $4, is_active = $5 WHERE id = $1",
        )
        .bind(record.id.as_str())
        .bind(&record.token_fingerprint)
        .bind(record.expires_at)
        .bind(record.last_activity)
        .bind(record.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update session", e)
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Session {} not found",
                record.id
            )));
        }
        Ok(())
    }

    async fn deactivate(&self, id: &SessionId) -> AppResult<bool> {
        let result =
            sqlx::query("UPDATE sessions SET is_active = FALSE WHERE id = $1 AND is_active")
                .bind(id.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Database, "Failed to deactivate session", e)
                })?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result =
            sqlx::query("UPDATE sessions SET is_active = FALSE WHERE user_id = $1 AND is_active")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    AppError::with_source(
                        ErrorKind::Database,
                        "Failed to deactivate user sessions",
                        e,
                    )
                })?;
        Ok(result.rows_affected())
    }

    async fn count_active_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sessions WHERE user_id = $1 AND is_active",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to count active sessions", e)
        })?;
        Ok(count as u64)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE WHERE is_active AND expires_at < $1",
        )
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to sweep expired sessions", e)
        })?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> AppResult<StoreStats> {
        let (total, active): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM sessions",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to compute session stats", e)
        })?;
        Ok(StoreStats {
            total_sessions: total as u64,
            active_sessions: active as u64,
        })
    }

    fn user_scoped_sweep(&self) -> Option<&dyn UserScopedSweep> {
        Some(self)
    }
}

#[async_trait]
impl UserScopedSweep for PgSessionStore {
    async fn sweep_expired_for_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE sessions SET is_active = FALSE \
             WHERE user_id = $1 AND is_active AND expires_at < $2",
        )
        .bind(user_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to sweep user sessions", e)
        })?;
        Ok(result.rows_affected())
    }
}

/// Masks the password portion of a connection URL for logging.
fn mask_password(url: &str) -> String {
    match url.find("://").map(|i| i + 3) {
        Some(start) => match url[start..].find('@') {
            Some(at) => {
                let credentials_end = start + at;
                match url[start..credentials_end].find(':') {
                    Some(colon) => {
                        format!("{}:****{}", &url[..start + colon], &url[credentials_end..])
                    }
                    None => url.to_string(),
                }
            }
            None => url.to_string(),
        },
        None => url.to_string(),
    }
}
