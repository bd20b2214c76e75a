use std::sync::Arc;

use anyhow::anyhow;
use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use tracing::{info, warn};

use corkboard_db::{Database, queries};
use corkboard_types::api::SignupRequest;
use corkboard_types::models::User;

use crate::blocking;
use crate::error::ApiError;
use crate::validate;

/// Hashed when the email is unknown so both failure paths pay for one verify.
const DUMMY_PASSWORD: &str = "corkboard-placeholder-password";

/// Persists users and verifies their passwords with Argon2id.
#[derive(Clone)]
pub struct CredentialStore {
    db: Arc<Database>,
    params: Params,
    dummy_hash: Arc<str>,
}

impl CredentialStore {
    pub fn new(db: Arc<Database>, params: Params) -> anyhow::Result<Self> {
        let dummy_hash = hash_password(&params, DUMMY_PASSWORD)?;
        Ok(Self {
            db,
            params,
            dummy_hash: dummy_hash.into(),
        })
    }

    pub async fn create_user(&self, req: SignupRequest) -> Result<User, ApiError> {
        let input = validate::signup(req)?;
        let store = self.clone();

        let user = blocking(move || {
            let password_hash = hash_password(&store.params, &input.password)?;
            let row = store
                .db
                .with_conn_mut(|conn| queries::insert_user(conn, &input.email, &password_hash))?
                .ok_or(ApiError::DuplicateUser)?;
            Ok(User::from(row))
        })
        .await?;

        info!("User {} registered", user.id);
        Ok(user)
    }

    /// Check an email/password pair. Unknown email and wrong password are
    /// indistinguishable: same error, and a hash verify runs either way.
    pub async fn verify_credentials(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let email = validate::normalize_email(email);
        let password = password.to_string();
        let store = self.clone();

        blocking(move || {
            let row = store
                .db
                .with_conn(|conn| queries::user_by_email(conn, &email))?;
            let hash = row
                .as_ref()
                .map_or(&*store.dummy_hash, |r| r.password_hash.as_str());
            let matches = verify_password(&store.params, &password, hash);

            match row {
                Some(row) if matches => Ok(User::from(row)),
                _ => Err(ApiError::InvalidCredentials),
            }
        })
        .await
    }

    /// Delete a user together with their sessions, boards and bookmarks.
    pub async fn delete_user(&self, user_id: i64) -> Result<(), ApiError> {
        let db = self.db.clone();
        let deleted = blocking(move || {
            Ok(db.with_conn_mut(|conn| queries::delete_user(conn, user_id))?)
        })
        .await?;
        if !deleted {
            return Err(ApiError::NotFound);
        }

        info!("User {} deleted", user_id);
        Ok(())
    }
}

fn hasher(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn hash_password(params: &Params, password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher(params)
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("Password hashing failed: {}", e))?;
    Ok(hash.to_string())
}

fn verify_password(params: &Params, password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => hasher(params)
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is unparseable: {}", e);
            false
        }
    }
}
