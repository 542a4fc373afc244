//! User-facing error taxonomy and its HTTP mapping.

use axum::{
    http::{header::RETRY_AFTER, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Every rejection a flow can produce. Login deliberately hides whether the
/// email or the password was wrong (`InvalidCredentials`), while recovery
/// reveals unknown users as `NotFound`; that asymmetry is intended.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("user already exists")]
    AlreadyExists,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid one-time code")]
    InvalidOtp,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("user not found")]
    NotFound,
    #[error("rate limit exceeded")]
    RateLimited { retry_after_secs: u64 },
    #[error("internal server error")]
    Internal,
}

impl AuthError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidInput(_) | AuthError::AlreadyExists => StatusCode::BAD_REQUEST,
            AuthError::InvalidCredentials
            | AuthError::InvalidOtp
            | AuthError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AuthError::NotFound => StatusCode::NOT_FOUND,
            AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AuthError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = match &self {
            AuthError::RateLimited { retry_after_secs } => json!({
                "error": self.to_string(),
                "retry_after_secs": retry_after_secs,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        let mut response = (self.status(), Json(body)).into_response();

        if let AuthError::RateLimited { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(RETRY_AFTER, value);
            }
        }

        response
    }
}
