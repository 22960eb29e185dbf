//! Stateless token encode/decode/reissue with configurable signing and TTL.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gatekeep_core::config::token::TokenConfig;
use gatekeep_core::error::AppError;

use crate::session::model::{IdentitySnapshot, SessionId};

use super::claims::Claims;

/// Failure modes of token decoding and reissue.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token string is not a structurally valid token.
    #[error("token is malformed")]
    Malformed,
    /// The signature does not verify under the configured secret.
    #[error("token signature is invalid")]
    BadSignature,
    /// The token's expiry timestamp has passed.
    #[error("token has expired")]
    Expired,
    /// The token is valid but not yet inside the refresh window.
    #[error("token is not yet eligible for reissue")]
    NotYetRefreshable,
    /// Claim serialization failed while re-signing.
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(msg) => AppError::internal(msg),
            other => AppError::authentication(other.to_string()),
        }
    }
}

/// A freshly signed token together with its expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
    /// The signed token string.
    pub token: String,
    /// Expiration timestamp of the token.
    pub expires_at: DateTime<Utc>,
}

/// Creates and validates signed tokens (HMAC-SHA256).
#[derive(Clone)]
pub struct TokenCodec {
    /// HMAC secret key for signing.
    encoding_key: EncodingKey,
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
    /// Issuer claim stamped into every token.
    issuer: String,
    /// Audience claim stamped into every token.
    audience: String,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .finish()
    }
}

impl TokenCodec {
    /// Creates a new codec from token configuration.
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew
        validation.set_issuer(&[&config.issuer]);
        validation.set_audience(&[&config.audience]);

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
        }
    }

    /// Signs a token carrying the given identity snapshot and session ID.
    ///
    /// Claim construction is deterministic; only the signature and the
    /// timestamps vary between calls.
    pub fn issue(
        &self,
        identity: &IdentitySnapshot,
        session_id: &SessionId,
        ttl: Duration,
    ) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let expires_at = now + ttl;

        let claims = Claims {
            sub: identity.user_id,
            sid: session_id.as_str().to_string(),
            username: identity.username.clone(),
            role: identity.role_name.clone(),
            permissions: identity.permissions.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to encode token: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Decodes and validates a token string.
    ///
    /// Expiry is checked explicitly after signature validation even though
    /// the underlying library embeds an expiry check — the enforcement point
    /// for this codec is business logic, not the primitive.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }

    /// Reissues a token whose expiry has entered the refresh window.
    ///
    /// Claims are carried forward unchanged except the timestamps; the new
    /// token preserves the original lifetime span (`exp - iat`), so extended
    /// "remember me" horizons survive rotation.
    pub fn reissue(
        &self,
        token: &str,
        refresh_window: Duration,
    ) -> Result<IssuedToken, TokenError> {
        let claims = self.decode(token)?;

        let now = Utc::now();
        let remaining = claims.exp - now.timestamp();
        if remaining > refresh_window.num_seconds() {
            return Err(TokenError::NotYetRefreshable);
        }

        let expires_at = now + Duration::seconds(claims.lifetime_seconds());
        let renewed = Claims {
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            ..claims
        };

        let token = encode(&Header::default(), &renewed, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(format!("Failed to re-encode token: {e}")))?;

        Ok(IssuedToken { token, expires_at })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn codec() -> TokenCodec {
        TokenCodec::new(&TokenConfig {
            secret: "unit-test-secret".to_string(),
            ..TokenConfig::default()
        })
    }

    fn identity() -> IdentitySnapshot {
        IdentitySnapshot {
            user_id: Uuid::new_v4(),
            username: "ada".to_string(),
            role_name: "operator".to_string(),
            permissions: vec!["orders:read".to_string(), "orders:write".to_string()],
        }
    }

    #[test]
    fn issue_then_decode_recovers_claims() {
        let codec = codec();
        let identity = identity();
        let sid = SessionId::generate();

        let issued = codec.issue(&identity, &sid, Duration::minutes(30)).unwrap();
        let claims = codec.decode(&issued.token).unwrap();

        assert_eq!(claims.user_id(), identity.user_id);
        assert_eq!(claims.username, identity.username);
        assert_eq!(claims.role, identity.role_name);
        assert_eq!(claims.permissions, identity.permissions);
        assert_eq!(claims.session_id(), sid);
    }

    #[test]
    fn tampered_token_fails_signature_check() {
        let codec = codec();
        let issued = codec
            .issue(&identity(), &SessionId::generate(), Duration::minutes(30))
            .unwrap();

        // Flip a character in the payload segment.
        let mut parts: Vec<String> = issued.token.split('.').map(String::from).collect();
        let mut payload: Vec<u8> = parts[1].clone().into_bytes();
        payload[0] = if payload[0] == b'A' { b'B' } else { b'A' };
        parts[1] = String::from_utf8(payload).unwrap();
        let tampered = parts.join(".");

        assert!(matches!(
            codec.decode(&tampered),
            Err(TokenError::BadSignature) | Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn wrong_secret_fails_signature_check() {
        let issued = codec()
            .issue(&identity(), &SessionId::generate(), Duration::minutes(30))
            .unwrap();

        let other = TokenCodec::new(&TokenConfig {
            secret: "a-different-secret".to_string(),
            ..TokenConfig::default()
        });

        assert!(matches!(
            other.decode(&issued.token),
            Err(TokenError::BadSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(
            codec().decode("definitely.not.a-token"),
            Err(TokenError::Malformed)
        ));
    }

    #[test]
    fn reissue_outside_window_is_gated() {
        let codec = codec();
        let issued = codec
            .issue(&identity(), &SessionId::generate(), Duration::minutes(30))
            .unwrap();

        // 30 minutes remaining, 5-minute window: not yet refreshable.
        assert!(matches!(
            codec.reissue(&issued.token, Duration::minutes(5)),
            Err(TokenError::NotYetRefreshable)
        ));
    }

    #[test]
    fn reissue_inside_window_extends_expiry_and_keeps_claims() {
        let codec = codec();
        let identity = identity();
        let sid = SessionId::generate();

        let issued = codec.issue(&identity, &sid, Duration::minutes(4)).unwrap();
        let renewed = codec.reissue(&issued.token, Duration::minutes(5)).unwrap();

        assert!(renewed.expires_at > issued.expires_at);

        let claims = codec.decode(&renewed.token).unwrap();
        assert_eq!(claims.session_id(), sid);
        assert_eq!(claims.user_id(), identity.user_id);
        assert_eq!(claims.permissions, identity.permissions);
        // Lifetime span is preserved across rotation.
        assert_eq!(claims.lifetime_seconds(), 4 * 60);
    }
}
