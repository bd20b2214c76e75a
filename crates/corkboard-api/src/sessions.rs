use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use corkboard_db::{Database, queries};
use corkboard_types::models::User;

use crate::blocking;
use crate::error::ApiError;

/// 256 bits of entropy per token.
pub const TOKEN_BYTES: usize = 32;

/// Longest session lifetime the store accepts (ten years).
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

const MAX_INSERT_ATTEMPTS: usize = 3;

/// A raw bearer token. Debug output is redacted.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Digest stored in the sessions table in place of the token.
    pub fn digest(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl From<&str> for SessionToken {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(..)")
    }
}

/// Issues, resolves and revokes opaque session tokens with a fixed lifetime.
#[derive(Clone)]
pub struct SessionStore {
    db: Arc<Database>,
    ttl_secs: i64,
}

impl SessionStore {
    pub fn new(db: Arc<Database>, ttl: Duration) -> anyhow::Result<Self> {
        if ttl > MAX_SESSION_TTL {
            bail!(
                "session lifetime of {}s exceeds the maximum of {}s",
                ttl.as_secs(),
                MAX_SESSION_TTL.as_secs()
            );
        }
        let ttl_secs = i64::try_from(ttl.as_secs()).context("session lifetime out of range")?;
        Ok(Self { db, ttl_secs })
    }

    pub async fn create_session(&self, user_id: i64) -> Result<SessionToken, ApiError> {
        let db = self.db.clone();
        let ttl_secs = self.ttl_secs;

        blocking(move || {
            for _ in 0..MAX_INSERT_ATTEMPTS {
                let token = SessionToken::generate();
                let digest = token.digest();
                let inserted = db.with_conn_mut(|conn| {
                    queries::insert_session(conn, &digest, user_id, ttl_secs)
                })?;
                if inserted {
                    info!("Session created for user {}", user_id);
                    return Ok(token);
                }
                debug!("Session token collision, regenerating");
            }
            Err(ApiError::Internal(anyhow!(
                "no unique session token after {} attempts",
                MAX_INSERT_ATTEMPTS
            )))
        })
        .await
    }

    /// Look up the user behind a token. Unknown, revoked and expired tokens
    /// all fail with `NoSuchSession`.
    pub async fn resolve_session(&self, token: &SessionToken) -> Result<User, ApiError> {
        let db = self.db.clone();
        let digest = token.digest();

        blocking(move || {
            db.with_conn(|conn| queries::session_user(conn, &digest))?
                .map(User::from)
                .ok_or(ApiError::NoSuchSession)
        })
        .await
    }

    /// Idempotent: revoking an unknown token succeeds.
    pub async fn revoke_session(&self, token: &SessionToken) -> Result<(), ApiError> {
        let db = self.db.clone();
        let digest = token.digest();

        let removed = blocking(move || {
            Ok(db.with_conn_mut(|conn| queries::delete_session(conn, &digest))?)
        })
        .await?;
        if removed {
            info!("Session revoked");
        }
        Ok(())
    }
}
