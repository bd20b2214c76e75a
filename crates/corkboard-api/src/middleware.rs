use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use tracing::{debug, warn};

use corkboard_types::models::User;

use crate::AppState;
use crate::error::ApiError;
use crate::sessions::SessionToken;

/// Identity attached to a request whose bearer token resolved to a live session.
#[derive(Debug, Clone)]
pub struct Identity {
    pub user: User,
    pub token: SessionToken,
}

/// The requesting party as seen by handlers and the ownership guard.
/// `Caller(None)` is an anonymous request.
#[derive(Debug, Clone, Default)]
pub struct Caller(pub Option<Identity>);

impl Caller {
    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn identity(&self) -> Result<&Identity, ApiError> {
        self.0.as_ref().ok_or(ApiError::Unauthenticated)
    }

    pub fn user_id(&self) -> Result<i64, ApiError> {
        self.identity().map(|identity| identity.user.id)
    }
}

impl From<Identity> for Caller {
    fn from(identity: Identity) -> Self {
        Self(Some(identity))
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(parts.extensions.get::<Identity>().cloned()))
    }
}

/// `Authorization: Bearer <token>`, or `None` when the header is absent or malformed.
pub fn bearer_token(headers: &HeaderMap) -> Option<SessionToken> {
    headers
        .typed_get::<Authorization<Bearer>>()
        .map(|auth| SessionToken::from(auth.token()))
}

/// Best-effort identity attach. Never rejects: a missing, malformed or dead
/// token leaves the request anonymous and each handler decides what it needs.
pub async fn attach_identity(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(req.headers()) {
        match state.sessions.resolve_session(&token).await {
            Ok(user) => {
                req.extensions_mut().insert(Identity { user, token });
            }
            Err(ApiError::NoSuchSession) => {
                debug!("Bearer token did not resolve to a session");
            }
            Err(e) => {
                warn!("Session lookup failed, continuing anonymously: {:#}", e);
            }
        }
    }

    next.run(req).await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use axum::http::header::AUTHORIZATION;

    use super::*;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn parses_bearer_header() {
        let token = bearer_token(&headers("Bearer abc123")).unwrap();
        assert_eq!(token.as_str(), "abc123");
    }

    #[test]
    fn malformed_or_missing_header_is_anonymous() {
        assert!(bearer_token(&HeaderMap::new()).is_none());
        assert!(bearer_token(&headers("Basic dXNlcjpwYXNz")).is_none());
        assert!(bearer_token(&headers("abc123")).is_none());
    }

    #[test]
    fn anonymous_caller_is_unauthenticated() {
        assert!(matches!(
            Caller::anonymous().user_id(),
            Err(ApiError::Unauthenticated)
        ));
    }
}
