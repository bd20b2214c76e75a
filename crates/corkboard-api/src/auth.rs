use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::info;

use corkboard_types::api::{LoginRequest, LoginResponse, SignupRequest};

use crate::AppState;
use crate::error::ApiError;
use crate::extract::Payload;
use crate::middleware::{Caller, bearer_token};

/// POST /auth/users
pub async fn signup(
    State(state): State<AppState>,
    Payload(req): Payload<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.credentials.create_user(req?).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /auth/sessions
pub async fn login(
    State(state): State<AppState>,
    Payload(req): Payload<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let req = req?;
    let user = state
        .credentials
        .verify_credentials(&req.email, &req.password)
        .await?;
    let token = state.sessions.create_session(user.id).await?;

    info!("User {} logged in", user.id);
    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token: token.into_inner(),
            user,
        }),
    ))
}

/// DELETE /auth/sessions
///
/// Revokes the caller's session. A dead or unknown bearer token is revoked
/// all the same, so repeating the call succeeds.
pub async fn logout(
    State(state): State<AppState>,
    caller: Caller,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = match caller.0 {
        Some(identity) => identity.token,
        None => bearer_token(&headers).ok_or(ApiError::Unauthenticated)?,
    };
    state.sessions.revoke_session(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me
pub async fn me(caller: Caller) -> Result<impl IntoResponse, ApiError> {
    let identity = caller.identity()?;
    Ok(Json(identity.user.clone()))
}

/// DELETE /auth/me. Removes the account and everything it owns.
pub async fn delete_me(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<StatusCode, ApiError> {
    let user_id = caller.user_id()?;
    state.credentials.delete_user(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
