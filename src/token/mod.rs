//! Signed bearer tokens asserting an authenticated email.
//!
//! Tokens are stateless HS256 JWTs with a fixed one-hour lifetime; there is
//! no refresh and no revocation list, so expiry forces a new login.

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Fixed token lifetime; expiry forces re-login.
pub const TOKEN_TTL_SECONDS: i64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token")]
    Invalid,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    iat: i64,
    exp: i64,
}

#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Signs a token asserting `email`, expiring [`TOKEN_TTL_SECONDS`] from now.
    ///
    /// # Errors
    /// Returns [`TokenError::Invalid`] if signing fails.
    pub fn issue(&self, email: &str) -> Result<String, TokenError> {
        self.issue_at(email, Utc::now())
    }

    fn issue_at(&self, email: &str, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            sub: email.to_string(),
            iat,
            exp: iat + TOKEN_TTL_SECONDS,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Invalid)
    }

    /// Checks signature and expiry; returns the asserted email on success.
    ///
    /// # Errors
    /// Returns [`TokenError::Expired`] for well-formed but stale tokens and
    /// [`TokenError::Invalid`] for anything else.
    pub fn verify(&self, token: &str) -> Result<String, TokenError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims.sub),
            Err(err) => match err.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                _ => Err(TokenError::Invalid),
            },
        }
    }
}

/// Pulls the token out of an `Authorization: Bearer <token>` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
