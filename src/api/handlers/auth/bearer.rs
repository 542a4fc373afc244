//! Bearer-token gate for the protected read endpoints.

use axum::http::HeaderMap;

use super::error::AuthError;
use super::state::AuthState;
use crate::token::{bearer_token, TokenError};

/// Verifies the `Authorization: Bearer` header and returns the asserted
/// email. Missing, malformed, expired and forged tokens each map to a
/// distinct 401 message.
pub(crate) fn require_bearer(state: &AuthState, headers: &HeaderMap) -> Result<String, AuthError> {
    let token = bearer_token(headers).ok_or(AuthError::Unauthorized("missing bearer token"))?;

    match state.tokens().verify(token) {
        Ok(email) => Ok(email),
        Err(TokenError::Expired) => Err(AuthError::Unauthorized("token expired")),
        Err(TokenError::Invalid) => Err(AuthError::Unauthorized("invalid token")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::handlers::auth::state::AuthConfig;
    use crate::audit::{Audit, MemoryAuditSink};
    use crate::otp::OtpService;
    use crate::ratelimit::NoopRateLimiter;
    use crate::store::MemoryUserStore;
    use crate::token::TokenService;
    use axum::http::{header::AUTHORIZATION, HeaderValue};
    use secrecy::SecretString;
    use std::sync::Arc;

    fn state() -> AuthState {
        AuthState::new(
            AuthConfig::new("http://localhost:3000".to_string()),
            Arc::new(MemoryUserStore::new()),
            Audit::new(Arc::new(MemoryAuditSink::new()), "server-1".to_string()),
            Arc::new(NoopRateLimiter),
            OtpService::new("AulaPass".to_string()),
            TokenService::new(&SecretString::from("test-signing-key".to_string())),
        )
    }

    #[test]
    fn missing_header_is_rejected() {
        let state = state();
        let headers = HeaderMap::new();
        assert_eq!(
            require_bearer(&state, &headers),
            Err(AuthError::Unauthorized("missing bearer token"))
        );
    }

    #[test]
    fn valid_token_yields_email() {
        let state = state();
        let token = state.tokens().issue("user@school.edu").expect("issue");
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        assert_eq!(
            require_bearer(&state, &headers).as_deref(),
            Ok("user@school.edu")
        );
    }

    #[test]
    fn forged_token_is_rejected() {
        let state = state();
        let other = TokenService::new(&SecretString::from("other-key".to_string()));
        let token = other.issue("user@school.edu").expect("issue");
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).expect("header"),
        );
        assert_eq!(
            require_bearer(&state, &headers),
            Err(AuthError::Unauthorized("invalid token"))
        );
    }
}
