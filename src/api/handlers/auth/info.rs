//! Service identity endpoint, optionally enriched with the caller's profile.

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, response::Response, Json};
use serde_json::json;
use std::sync::Arc;

use super::bearer::require_bearer;
use super::error::AuthError;
use super::state::AuthState;
use super::types::{ErrorResponse, InfoResponse, UserProfile};
use super::{fail, ok};

#[utoipa::path(
    get,
    path = "/api/getInfo",
    responses(
        (status = 200, description = "Service identity and, when authenticated, the caller's profile", body = InfoResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "info"
)]
pub async fn get_info(state: Extension<Arc<AuthState>>, headers: HeaderMap) -> Response {
    let email = if state.config().protect_info() {
        match require_bearer(&state, &headers) {
            Ok(email) => Some(email),
            Err(err) => {
                return fail(
                    &state,
                    "info access rejected",
                    json!({"reason": err.to_string()}),
                    err,
                )
                .await;
            }
        }
    } else {
        // Unprotected mode still personalizes when a valid token is present.
        require_bearer(&state, &headers).ok()
    };

    let user = match email {
        Some(email) => match state.store().find_by_email(&email).await {
            Ok(Some(user)) => Some(UserProfile {
                email: user.email,
                username: user.username,
                grado: user.grado,
                grupo: user.grupo,
            }),
            Ok(None) => None,
            Err(err) => {
                return fail(
                    &state,
                    "info query failed",
                    json!({"email": email, "error": err.to_string()}),
                    AuthError::Internal,
                )
                .await;
            }
        },
        None => None,
    };

    ok(&state, "info queried", json!({})).await;
    Json(InfoResponse {
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        server: state.config().server_id().to_string(),
        user,
    })
    .into_response()
}
