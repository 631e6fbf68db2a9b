use std::time::Duration;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::claims::{Claims, SessionPayload, TokenKind},
    config::{JwtConfig, MAX_TTL_SECONDS},
};

/// Every verification failure collapses into this one variant.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TokenError {
    #[error("invalid or expired token")]
    Invalid,
}

#[derive(Clone)]
struct KindKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KindKeys {
    fn new(secret: &str, ttl_seconds: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::from_secs(ttl_seconds.clamp(0, MAX_TTL_SECONDS) as u64),
        }
    }
}

/// A signed token and the instant it stops verifying.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: OffsetDateTime,
    pub ttl: Duration,
}

/// Fresh access + refresh pair. Lives for one request only.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Signs and verifies both token kinds, each with its own secret and ttl.
#[derive(Clone)]
pub struct TokenCodec {
    access: KindKeys,
    refresh: KindKeys,
}

impl TokenCodec {
    pub fn new(cfg: &JwtConfig) -> Self {
        Self {
            access: KindKeys::new(&cfg.access_secret, cfg.access_ttl_seconds),
            refresh: KindKeys::new(&cfg.refresh_secret, cfg.refresh_ttl_seconds),
        }
    }

    fn keys(&self, kind: TokenKind) -> &KindKeys {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue(
        &self,
        kind: TokenKind,
        payload: &SessionPayload,
    ) -> anyhow::Result<IssuedToken> {
        let keys = self.keys(kind);
        let now = OffsetDateTime::now_utc();
        let expires_at = now + TimeDuration::seconds(keys.ttl.as_secs() as i64);
        let claims = Claims {
            payload: payload.clone(),
            kind,
            jti: Uuid::new_v4(),
            iat: now.unix_timestamp() as usize,
            exp: expires_at.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)?;
        debug!(user_id = %payload.id, kind = ?kind, "jwt signed");
        Ok(IssuedToken {
            token,
            expires_at,
            ttl: keys.ttl,
        })
    }

    pub fn issue_pair(&self, payload: &SessionPayload) -> anyhow::Result<TokenPair> {
        Ok(TokenPair {
            access: self.issue(TokenKind::Access, payload)?,
            refresh: self.issue(TokenKind::Refresh, payload)?,
        })
    }

    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<SessionPayload, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        let data = decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map_err(|_| TokenError::Invalid)?;
        if data.claims.kind != kind {
            return Err(TokenError::Invalid);
        }
        debug!(user_id = %data.claims.payload.id, kind = ?kind, "jwt verified");
        Ok(data.claims.payload)
    }
}

#[cfg(test)]
pub(crate) fn test_codec() -> TokenCodec {
    TokenCodec::new(&JwtConfig {
        access_secret: "access-secret".into(),
        access_ttl_seconds: 300,
        refresh_secret: "refresh-secret".into(),
        refresh_ttl_seconds: 3600,
    })
}
