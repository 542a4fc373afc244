//! Registration, login, recovery and audit read-back flows.

use axum::response::{IntoResponse, Response};
use serde_json::Value;

pub mod bearer;
pub mod error;
pub mod info;
pub mod login;
pub mod logs;
pub mod password;
pub mod register;
pub mod state;
pub mod types;
pub mod utils;


pub use state::{AuthConfig, AuthState};

use error::AuthError;

/// Records the rejection on the audit trail, then turns it into the
/// response. The audit write happens before the response leaves but can
/// never change it.
pub(crate) async fn fail(
    state: &AuthState,
    message: &str,
    details: Value,
    err: AuthError,
) -> Response {
    state.audit().error(message, details).await;
    err.into_response()
}

/// Audit-trail counterpart of [`fail`] for accepted operations.
pub(crate) async fn ok(state: &AuthState, message: &str, details: Value) {
    state.audit().info(message, details).await;
}
