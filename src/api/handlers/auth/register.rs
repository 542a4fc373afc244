//! Account registration with TOTP enrollment.

use axum::{extract::Extension, response::IntoResponse, response::Response, Json};
use serde_json::json;
use std::sync::Arc;

use super::error::AuthError;
use super::state::AuthState;
use super::types::{ErrorResponse, RegisterRequest, RegisterResponse};
use super::utils::{hash_password, normalize_email, valid_email};
use super::{fail, ok};
use crate::store::{CreateOutcome, NewUser};

#[utoipa::path(
    post,
    path = "/api/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created, OTP secret disclosed once", body = RegisterResponse),
        (status = 400, description = "Validation error or duplicate email", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    tag = "auth"
)]
pub async fn register(
    state: Extension<Arc<AuthState>>,
    payload: Option<Json<RegisterRequest>>,
) -> Response {
    let Some(Json(request)) = payload else {
        return fail(
            &state,
            "registration rejected",
            json!({"reason": "missing payload"}),
            AuthError::InvalidInput("missing payload"),
        )
        .await;
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return fail(
            &state,
            "registration rejected",
            json!({"reason": "invalid email"}),
            AuthError::InvalidInput("invalid email"),
        )
        .await;
    }
    if request.username.trim().is_empty() {
        return fail(
            &state,
            "registration rejected",
            json!({"email": email, "reason": "missing username"}),
            AuthError::InvalidInput("missing username"),
        )
        .await;
    }
    if request.password.is_empty() {
        return fail(
            &state,
            "registration rejected",
            json!({"email": email, "reason": "missing password"}),
            AuthError::InvalidInput("missing password"),
        )
        .await;
    }
    if request.grado.trim().is_empty() || request.grupo.trim().is_empty() {
        return fail(
            &state,
            "registration rejected",
            json!({"email": email, "reason": "missing grado or grupo"}),
            AuthError::InvalidInput("missing grado or grupo"),
        )
        .await;
    }

    // Cheap early check; the store's uniqueness constraint is the real guard.
    match state.store().find_by_email(&email).await {
        Ok(Some(_)) => {
            return fail(
                &state,
                "registration rejected",
                json!({"email": email, "reason": "duplicate email"}),
                AuthError::AlreadyExists,
            )
            .await;
        }
        Ok(None) => {}
        Err(err) => {
            return fail(
                &state,
                "registration failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    }

    let enrollment = match state.otp().generate(&email) {
        Ok(enrollment) => enrollment,
        Err(err) => {
            return fail(
                &state,
                "registration failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    let hash = match hash_password(request.password).await {
        Ok(hash) => hash,
        Err(err) => {
            return fail(
                &state,
                "registration failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    let new_user = NewUser {
        email: email.clone(),
        username: request.username.trim().to_string(),
        password: hash,
        grado: request.grado.trim().to_string(),
        grupo: request.grupo.trim().to_string(),
        otp_secret: enrollment.secret_base32.clone(),
    };

    match state.store().create(new_user).await {
        Ok(CreateOutcome::Created(_)) => {
            ok(
                &state,
                "user registered",
                json!({"email": email}),
            )
            .await;
            (
                axum::http::StatusCode::CREATED,
                Json(RegisterResponse {
                    message: "user registered".to_string(),
                    secret: enrollment.secret_base32,
                    otpauth_url: enrollment.otpauth_uri,
                }),
            )
                .into_response()
        }
        Ok(CreateOutcome::Duplicate) => {
            fail(
                &state,
                "registration rejected",
                json!({"email": email, "reason": "duplicate email"}),
                AuthError::AlreadyExists,
            )
            .await
        }
        Err(err) => {
            fail(
                &state,
                "registration failed",
                json!({"email": email, "error": err.to_string()}),
                AuthError::Internal,
            )
            .await
        }
    }
}
