//! Password recovery: OTP-gated reset, no email round-trip.

use axum::{extract::Extension, response::IntoResponse, response::Response, Json};
use serde_json::json;
use std::sync::Arc;

use super::error::AuthError;
use super::state::AuthState;
use super::types::{ErrorResponse, MessageResponse, RecoverPasswordRequest, ResetPasswordRequest};
use super::utils::{hash_password, normalize_email, valid_email};
use super::{fail, ok};

#[utoipa::path(
    post,
    path = "/api/recover-password",
    request_body = RecoverPasswordRequest,
    responses(
        (status = 200, description = "Account exists, proceed with the one-time code", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 404, description = "Unknown email", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn recover_password(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RecoverPasswordRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return fail(
            &state,
            "password recovery rejected",
            json!({"reason": "missing payload"}),
            AuthError::InvalidInput("missing payload"),
        )
        .await;
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return fail(
            &state,
            "password recovery rejected",
            json!({"reason": "invalid email"}),
            AuthError::InvalidInput("invalid email"),
        )
        .await;
    }

    // Unlike login, recovery does reveal whether the account exists.
    match state.store().find_by_email(&email).await {
        Ok(Some(_)) => {
            ok(&state, "password recovery started", json!({"email": email})).await;
            Json(MessageResponse {
                message: "enter your one-time code and a new password".to_string(),
            })
            .into_response()
        }
        Ok(None) => {
            fail(
                &state,
                "password recovery rejected",
                json!({"email": email, "reason": "unknown email"}),
                AuthError::NotFound,
            )
            .await
        }
        Err(err) => {
            fail(
                &state,
                "password recovery failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password replaced", body = MessageResponse),
        (status = 400, description = "Validation error", body = ErrorResponse),
        (status = 401, description = "Wrong one-time code", body = ErrorResponse),
        (status = 404, description = "Unknown email", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn reset_password(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<ResetPasswordRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return fail(
            &state,
            "password reset rejected",
            json!({"reason": "missing payload"}),
            AuthError::InvalidInput("missing payload"),
        )
        .await;
    };

    let email = normalize_email(&request.email);
    if email.is_empty() || request.otp.trim().is_empty() || request.new_password.is_empty() {
        return fail(
            &state,
            "password reset rejected",
            json!({"email": email, "reason": "missing email, otp or new password"}),
            AuthError::InvalidInput("missing email, otp or new password"),
        )
        .await;
    }

    let user = match state.store().find_by_email(&email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return fail(
                &state,
                "password reset rejected",
                json!({"email": email, "reason": "unknown email"}),
                AuthError::NotFound,
            )
            .await;
        }
        Err(err) => {
            return fail(
                &state,
                "password reset failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    if !state.otp().verify(&user.otp_secret, &request.otp) {
        return fail(
            &state,
            "password reset rejected",
            json!({"email": email, "reason": "wrong code"}),
            AuthError::InvalidOtp,
        )
        .await;
    }

    let hash = match hash_password(request.new_password).await {
        Ok(hash) => hash,
        Err(err) => {
            return fail(
                &state,
                "password reset failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    match state.store().update_password(user.id, &hash).await {
        Ok(true) => {
            ok(&state, "password reset", json!({"email": email})).await;
            Json(MessageResponse {
                message: "password updated".to_string(),
            })
            .into_response()
        }
        // The user vanished between lookup and update.
        Ok(false) => {
            fail(
                &state,
                "password reset rejected",
                json!({"email": email, "reason": "unknown email"}),
                AuthError::NotFound,
            )
            .await
        }
        Err(err) => {
            fail(
                &state,
                "password reset failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await
        }
    }
}
