//! HTTP layer: session auth, ownership checks and the board/bookmark handlers.

pub mod auth;
pub mod boards;
pub mod bookmarks;
pub mod credentials;
pub mod error;
pub mod extract;
pub mod guard;
pub mod middleware;
pub mod sessions;
pub mod validate;

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use argon2::Params;
use axum::{
    Router,
    routing::{get, patch, post},
};
use tracing::error;

use corkboard_db::Database;

use crate::credentials::CredentialStore;
use crate::error::ApiError;
use crate::sessions::SessionStore;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub credentials: CredentialStore,
    pub sessions: SessionStore,
}

/// Knobs for the auth layer.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl: Duration,
    pub password_params: Params,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(30 * 24 * 60 * 60),
            password_params: Params::default(),
        }
    }
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, config: AuthConfig) -> anyhow::Result<AppState> {
        let credentials = CredentialStore::new(db.clone(), config.password_params)?;
        let sessions = SessionStore::new(db.clone(), config.session_ttl)?;
        Ok(Arc::new(Self {
            db,
            credentials,
            sessions,
        }))
    }
}

/// All routes, with the identity middleware in front of every one of them.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/users", post(auth::signup))
        .route("/auth/sessions", post(auth::login).delete(auth::logout))
        .route("/auth/me", get(auth::me).delete(auth::delete_me))
        .route("/boards", get(boards::list_boards).post(boards::create_board))
        .route(
            "/boards/{id}",
            get(boards::get_board)
                .patch(boards::update_board)
                .delete(boards::delete_board),
        )
        .route(
            "/boards/{id}/bookmarks",
            get(bookmarks::list_bookmarks).post(bookmarks::create_bookmark),
        )
        .route(
            "/boards/{id}/bookmarks/{bookmark_id}",
            patch(bookmarks::update_board_bookmark).delete(bookmarks::delete_board_bookmark),
        )
        .route(
            "/bookmarks/{id}",
            patch(bookmarks::update_bookmark).delete(bookmarks::delete_bookmark),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::attach_identity,
        ))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Run blocking database or hashing work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal(anyhow!("blocking task failed"))
    })?
}
