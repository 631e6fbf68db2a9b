//! Error taxonomy surfaced at the HTTP boundary.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::auth::repo::StoreError;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("A user with this login already exists")]
    Conflict,

    #[error("Login or password is incorrect")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Refresh token malformed")]
    MalformedRefreshToken,

    #[error("{0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Store(StoreError),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict => AuthError::Conflict,
            other => AuthError::Store(other),
        }
    }
}

impl AuthError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::PasswordMismatch | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::Conflict => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            AuthError::MalformedRefreshToken => StatusCode::FORBIDDEN,
            AuthError::Store(_) | AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::PasswordMismatch => "PASSWORD_MISMATCH",
            AuthError::Conflict => "CONFLICT",
            AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
            AuthError::InvalidToken => "INVALID_TOKEN",
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::MalformedRefreshToken => "MALFORMED_REFRESH_TOKEN",
            AuthError::Validation(_) => "VALIDATION",
            AuthError::Store(_) | AuthError::Internal(_) => "INTERNAL",
        }
    }

    /// Message safe to send to the client; infrastructure detail stays in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AuthError::Store(_) | AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "error": self.error_code(),
            "message": self.public_message(),
        }));
        (status, body).into_response()
    }
}
