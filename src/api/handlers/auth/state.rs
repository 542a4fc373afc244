//! Auth configuration and shared state.

use std::sync::Arc;

use crate::audit::Audit;
use crate::otp::OtpService;
use crate::ratelimit::RateLimiter;
use crate::store::UserStore;
use crate::token::TokenService;

const DEFAULT_SERVER_ID: &str = "server-1";
const DEFAULT_OTP_ISSUER: &str = "AulaPass";
const DEFAULT_LOGS_PAGE_SIZE: i64 = 100;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_url: String,
    server_id: String,
    otp_issuer: String,
    protect_info: bool,
    protect_logs: bool,
    logs_page_size: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_url: String) -> Self {
        Self {
            frontend_url,
            server_id: DEFAULT_SERVER_ID.to_string(),
            otp_issuer: DEFAULT_OTP_ISSUER.to_string(),
            protect_info: true,
            protect_logs: true,
            logs_page_size: DEFAULT_LOGS_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_server_id(mut self, server_id: String) -> Self {
        self.server_id = server_id;
        self
    }

    #[must_use]
    pub fn with_otp_issuer(mut self, otp_issuer: String) -> Self {
        self.otp_issuer = otp_issuer;
        self
    }

    #[must_use]
    pub fn with_protect_info(mut self, protect_info: bool) -> Self {
        self.protect_info = protect_info;
        self
    }

    #[must_use]
    pub fn with_protect_logs(mut self, protect_logs: bool) -> Self {
        self.protect_logs = protect_logs;
        self
    }

    #[must_use]
    pub fn with_logs_page_size(mut self, logs_page_size: i64) -> Self {
        self.logs_page_size = logs_page_size;
        self
    }

    #[must_use]
    pub fn frontend_url(&self) -> &str {
        &self.frontend_url
    }

    #[must_use]
    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    #[must_use]
    pub fn otp_issuer(&self) -> &str {
        &self.otp_issuer
    }

    #[must_use]
    pub fn protect_info(&self) -> bool {
        self.protect_info
    }

    #[must_use]
    pub fn protect_logs(&self) -> bool {
        self.protect_logs
    }

    #[must_use]
    pub fn logs_page_size(&self) -> i64 {
        self.logs_page_size
    }
}

pub struct AuthState {
    config: AuthConfig,
    store: Arc<dyn UserStore>,
    audit: Audit,
    rate_limiter: Arc<dyn RateLimiter>,
    otp: OtpService,
    tokens: TokenService,
}

impl AuthState {
    #[must_use]
    pub fn new(
        config: AuthConfig,
        store: Arc<dyn UserStore>,
        audit: Audit,
        rate_limiter: Arc<dyn RateLimiter>,
        otp: OtpService,
        tokens: TokenService,
    ) -> Self {
        Self {
            config,
            store,
            audit,
            rate_limiter,
            otp,
            tokens,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn store(&self) -> &dyn UserStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn audit(&self) -> &Audit {
        &self.audit
    }

    #[must_use]
    pub fn rate_limiter(&self) -> &dyn RateLimiter {
        self.rate_limiter.as_ref()
    }

    #[must_use]
    pub fn otp(&self) -> &OtpService {
        &self.otp
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }
}
