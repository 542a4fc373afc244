//! Two-step login: password check, then one-time code for the token.

use axum::{extract::Extension, response::IntoResponse, response::Response, Json};
use serde_json::json;
use std::sync::Arc;

use super::error::AuthError;
use super::state::AuthState;
use super::types::{ErrorResponse, LoginRequest, MessageResponse, TokenResponse, VerifyOtpRequest};
use super::utils::{normalize_email, verify_password};
use super::{fail, ok};

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Password accepted, one-time code required", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unknown email or wrong password", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn login(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return fail(
            &state,
            "login rejected",
            json!({"reason": "missing payload"}),
            AuthError::InvalidInput("missing payload"),
        )
        .await;
    };

    // No explicit presence check: empty email or password falls through the
    // lookup and hash comparison to the same 401 as any bad credential.
    // Unknown email and wrong password produce the same response; only the
    // audit trail tells them apart.
    let email = normalize_email(&request.email);
    let user = match state.store().find_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return fail(
                &state,
                "login rejected",
                json!({"email": email, "reason": "unknown email"}),
                AuthError::InvalidCredentials,
            )
            .await;
        }
        Err(err) => {
            return fail(
                &state,
                "login failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    match verify_password(request.password, user.password).await {
        Ok(true) => {}
        Ok(false) => {
            return fail(
                &state,
                "login rejected",
                json!({"email": email, "reason": "wrong password"}),
                AuthError::InvalidCredentials,
            )
            .await;
        }
        Err(err) => {
            return fail(
                &state,
                "login failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    }

    ok(&state, "password accepted", json!({"email": email})).await;
    Json(MessageResponse {
        message: "enter your one-time code".to_string(),
    })
    .into_response()
}

#[utoipa::path(
    post,
    path = "/api/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Code accepted, bearer token issued", body = TokenResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Unknown user or wrong code", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<VerifyOtpRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return fail(
            &state,
            "otp verification rejected",
            json!({"reason": "missing payload"}),
            AuthError::InvalidInput("missing payload"),
        )
        .await;
    };

    // As with login, missing fields are not special-cased: an empty email is
    // an unknown user and an empty code is an invalid code.
    let email = normalize_email(&request.email);

    let user = match state.store().find_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return fail(
                &state,
                "otp verification rejected",
                json!({"email": email, "reason": "unknown email"}),
                AuthError::Unauthorized("user not found"),
            )
            .await;
        }
        Err(err) => {
            return fail(
                &state,
                "otp verification failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    if !state.otp().verify(&user.otp_secret, &request.otp) {
        return fail(
            &state,
            "otp verification rejected",
            json!({"email": email, "reason": "wrong code"}),
            AuthError::InvalidOtp,
        )
        .await;
    }

    let token = match state.tokens().issue(&email) {
        Ok(token) => token,
        Err(err) => {
            return fail(
                &state,
                "otp verification failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    ok(&state, "login completed", json!({"email": email})).await;
    Json(TokenResponse {
        message: "login successful".to_string(),
        token,
    })
    .into_response()
}
