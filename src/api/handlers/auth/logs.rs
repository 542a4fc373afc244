//! Audit log read-back endpoint.

use axum::{extract::Extension, http::HeaderMap, response::IntoResponse, response::Response, Json};
use serde_json::json;
use std::sync::Arc;

use super::bearer::require_bearer;
use super::error::AuthError;
use super::state::AuthState;
use super::types::{ErrorResponse, LogsResponse};
use super::{fail, ok};

#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Per-server level counts plus the most recent entries", body = LogsResponse),
        (status = 401, description = "Missing or invalid bearer token", body = ErrorResponse),
        (status = 429, description = "Rate limited", body = ErrorResponse),
        (status = 500, description = "Internal error", body = ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "audit"
)]
pub async fn logs(state: Extension<Arc<AuthState>>, headers: HeaderMap) -> Response {
    if state.config().protect_logs() {
        if let Err(err) = require_bearer(&state, &headers) {
            return fail(
                &state,
                "logs access rejected",
                json!({"reason": err.to_string()}),
                err,
            )
            .await;
        }
    }

    let summary = match state.audit().sink().summary().await {
        Ok(summary) => summary,
        Err(err) => {
            return fail(
                &state,
                "logs query failed",
                json!({"error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    let recent = match state
        .audit()
        .sink()
        .recent(state.config().logs_page_size())
        .await
    {
        Ok(recent) => recent,
        Err(err) => {
            return fail(
                &state,
                "logs query failed",
                json!({"error": err.to_string()}),
                AuthError::Internal,
            )
            .await;
        }
    };

    ok(&state, "logs queried", json!({"entries": recent.len()})).await;
    Json(LogsResponse { summary, recent }).into_response()
}
