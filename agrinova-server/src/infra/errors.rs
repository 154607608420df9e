use axum::{
    Json,
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use std::time::Duration;

use agrinova_core::AuthError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    /// Sent as `Retry-After` when set.
    pub retry_after: Option<Duration>,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Duration) -> Self {
        Self {
            retry_after: Some(retry_after),
            ..Self::new(StatusCode::TOO_MANY_REQUESTS, message)
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "message": self.message,
                "status": self.status.as_u16(),
            }
        }));

        let mut response = (self.status, body).into_response();
        if let Some(retry_after) = self.retry_after {
            // Round up so clients never retry a second early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.user_message();
        match &err {
            AuthError::InvalidCredentials
            | AuthError::AccountInactive
            | AuthError::InvalidToken
            | AuthError::TokenNotFoundOrRevokedOrExpired
            | AuthError::InvalidSession => {
                Self::unauthorized(message)
            }
            AuthError::DeviceNotAuthorized
            | AuthError::DeviceFingerprintMismatch
            | AuthError::MobileAccessDenied(_)
            | AuthError::NoCompany
            | AuthError::NoAssignments
            | AuthError::InsufficientRole(_) => Self::forbidden(message),
            AuthError::RateLimited { retry_after } => {
                Self::rate_limited(message, *retry_after)
            }
            AuthError::DeviceNotFound => Self::not_found(message),
            AuthError::DeviceAlreadyBound => Self::conflict(message),
            AuthError::InvalidRequest(detail) => {
                Self::bad_request(format!("{message}: {detail}"))
            }
            AuthError::Timeout => {
                tracing::warn!(error = %err, "request exceeded its time budget");
                Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
            }
            AuthError::Crypto(_) | AuthError::Store(_) => {
                tracing::error!(error = ?err, "auth operation failed");
                Self::internal(message)
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!(error = ?err, "unhandled error");
        Self::internal("Internal server error")
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!(error = ?err, "database operation failed");
        Self::internal("Database operation failed")
    }
}
