//! Request/response types for the auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::audit::{LogEntry, Summary};

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
    pub grado: String,
    pub grupo: String,
}

/// The only response that ever carries the raw OTP secret.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterResponse {
    pub message: String,
    pub secret: String,
    pub otpauth_url: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenResponse {
    pub message: String,
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RecoverPasswordRequest {
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogsResponse {
    pub summary: Summary,
    pub recent: Vec<LogEntry>,
}

/// Profile fields safe to echo back; no hash, no OTP secret.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserProfile {
    pub email: String,
    pub username: String,
    pub grado: String,
    pub grupo: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct InfoResponse {
    pub service: String,
    pub version: String,
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserProfile>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Context, Result};

    #[test]
    fn register_request_round_trips() -> Result<()> {
        let request = RegisterRequest {
            email: "ada@school.edu".to_string(),
            username: "ada".to_string(),
            password: "hunter2".to_string(),
            grado: "5".to_string(),
            grupo: "B".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let email = value
            .get("email")
            .and_then(serde_json::Value::as_str)
            .context("missing email")?;
        assert_eq!(email, "ada@school.edu");
        let decoded: RegisterRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.grupo, "B");
        Ok(())
    }

    #[test]
    fn reset_password_request_round_trips() -> Result<()> {
        let request = ResetPasswordRequest {
            email: "ada@school.edu".to_string(),
            otp: "123456".to_string(),
            new_password: "correct horse".to_string(),
        };
        let value = serde_json::to_value(&request)?;
        let decoded: ResetPasswordRequest = serde_json::from_value(value)?;
        assert_eq!(decoded.new_password, "correct horse");
        Ok(())
    }
}
