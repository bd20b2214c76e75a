use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

use corkboard_types::api::{ErrorBody, FieldError};

/// Every failure a store, guard or handler can surface to a client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input")]
    InvalidInput(Vec<FieldError>),

    #[error("authentication required")]
    Unauthenticated,

    #[error("you do not own this resource")]
    Unauthorized,

    #[error("resource not found")]
    NotFound,

    #[error("a user with this email already exists")]
    DuplicateUser,

    #[error("email or password invalid")]
    InvalidCredentials,

    #[error("no such session")]
    NoSuchSession,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::InvalidInput(vec![FieldError::new(field, message)])
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated | Self::InvalidCredentials | Self::NoSuchSession => {
                StatusCode::UNAUTHORIZED
            }
            Self::Unauthorized => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::DuplicateUser => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::Unauthenticated => "unauthenticated",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::DuplicateUser => "duplicate_user",
            Self::InvalidCredentials => "invalid_credentials",
            Self::NoSuchSession => "no_such_session",
            Self::Internal(_) => "internal",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::invalid("body", &rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let kind = self.kind();

        // Internal detail is logged, never sent.
        let (message, fields) = match self {
            Self::Internal(e) => {
                error!("Internal error: {:#}", e);
                ("internal server error".to_string(), Vec::new())
            }
            Self::InvalidInput(fields) => ("invalid input".to_string(), fields),
            other => (other.to_string(), Vec::new()),
        };

        (
            status,
            Json(ErrorBody {
                error: kind.to_string(),
                message,
                fields,
            }),
        )
            .into_response()
    }
}
