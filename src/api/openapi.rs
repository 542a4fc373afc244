//! `OpenAPI` document for the served routes.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::handlers::{auth, health};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::register::register,
        auth::login::login,
        auth::login::verify_otp,
        auth::password::recover_password,
        auth::password::reset_password,
        auth::logs::logs,
        auth::info::get_info,
    ),
    components(schemas(
        health::Health,
        auth::types::RegisterRequest,
        auth::types::RegisterResponse,
        auth::types::LoginRequest,
        auth::types::VerifyOtpRequest,
        auth::types::TokenResponse,
        auth::types::RecoverPasswordRequest,
        auth::types::ResetPasswordRequest,
        auth::types::MessageResponse,
        auth::types::LogsResponse,
        auth::types::InfoResponse,
        auth::types::UserProfile,
        auth::types::ErrorResponse,
        crate::audit::LogEntry,
        crate::audit::LogLevel,
        crate::audit::LevelCounts,
        crate::audit::RequestContext,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, two-step login and password recovery"),
        (name = "info", description = "Service identity"),
        (name = "audit", description = "Audit trail read-back"),
        (name = "health", description = "Liveness and dependency checks"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_covers_all_routes() {
        let spec = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/register",
            "/api/login",
            "/api/verify-otp",
            "/api/recover-password",
            "/api/reset-password",
            "/api/logs",
            "/api/getInfo",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn document_declares_bearer_scheme() {
        let spec = ApiDoc::openapi();
        let components = spec.components.unwrap_or_default();
        assert!(components.security_schemes.contains_key("bearer"));
    }
}
