use axum::{
    response::{IntoResponse, Response},
    Json,
};
use http::StatusCode;
use serde_json::json;
use shortener_db::DbError;
use thiserror::Error;
use tracing::error;

use crate::{
    authorize::AuthRejection,
    login::{LoginError, SignupError},
    profile::AggregationError,
};

/// Error returned from API handlers, rendered as `{"message": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// Details are logged, never sent to the client
    #[error("internal server error")]
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(err) => {
                error!(?err, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(value: DbError) -> Self {
        Self::Internal(value.into())
    }
}

impl From<AggregationError> for ApiError {
    fn from(value: AggregationError) -> Self {
        Self::Internal(value.into())
    }
}

impl From<AuthRejection> for ApiError {
    fn from(value: AuthRejection) -> Self {
        match value {
            AuthRejection::AnonymousCredential(err) => Self::Internal(err.into()),
            rejection => Self::Unauthorized(rejection.to_string()),
        }
    }
}

impl From<LoginError> for ApiError {
    fn from(value: LoginError) -> Self {
        match value {
            LoginError::Credentials => Self::Unauthorized(value.to_string()),
            LoginError::Db(err) => Self::Internal(err.into()),
            LoginError::Signing(err) => Self::Internal(err.into()),
        }
    }
}

impl From<SignupError> for ApiError {
    fn from(value: SignupError) -> Self {
        match value {
            SignupError::InvalidInput(_) => Self::BadRequest(value.to_string()),
            SignupError::LoginTaken(_) => Self::Conflict(value.to_string()),
            SignupError::Hash => Self::Internal(value.into()),
            SignupError::Db(err) => Self::Internal(err.into()),
        }
    }
}
