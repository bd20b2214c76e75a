//! Extractors that fold axum's rejections into `ApiError`.

use std::convert::Infallible;

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::ApiError;

/// Path parameters. An id that does not parse cannot name a resource, so the
/// rejection is `NotFound` rather than axum's plain-text 400. Mutating
/// handlers take it as `Result<Ids<T>, ApiError>` and check the caller first,
/// so an anonymous request is `Unauthenticated` whatever its path.
pub struct Ids<T>(pub T);

impl<S, T> FromRequestParts<S> for Ids<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(Ids(value)),
            Err(rejection) => {
                debug!("Unresolvable path {}: {}", parts.uri.path(), rejection.body_text());
                Err(ApiError::NotFound)
            }
        }
    }
}

/// A JSON body whose parse result is handed to the handler instead of
/// rejecting the request. Handlers authorize before unwrapping it.
pub struct Payload<T>(pub Result<T, ApiError>);

impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let parsed = Json::<T>::from_request(req, state)
            .await
            .map(|Json(value)| value)
            .map_err(ApiError::from);
        Ok(Payload(parsed))
    }
}
