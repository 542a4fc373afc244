//! TOTP secret generation and verification.
//!
//! Parameters follow the authenticator-app defaults: SHA1, 6 digits, 30
//! second step, with a skew tolerance of one step on either side.

use anyhow::{anyhow, Result};
use std::time::{SystemTime, UNIX_EPOCH};
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP: u64 = 30;

/// One-time disclosure returned at enrollment. The raw secret is never
/// shown again after this.
#[derive(Debug)]
pub struct Enrollment {
    pub secret_base32: String,
    pub otpauth_uri: String,
}

#[derive(Clone, Debug)]
pub struct OtpService {
    issuer: String,
}

impl OtpService {
    #[must_use]
    pub fn new(issuer: String) -> Self {
        Self { issuer }
    }

    /// Generates a fresh random secret plus the provisioning URI for QR
    /// enrollment, labeled `<issuer>:<account>`.
    ///
    /// # Errors
    /// Returns an error if secret generation fails or the account name is
    /// not representable in an otpauth URI.
    pub fn generate(&self, account: &str) -> Result<Enrollment> {
        let secret = Secret::generate_secret();
        let secret_bytes = secret
            .to_bytes()
            .map_err(|e| anyhow!("secret generation error: {e:?}"))?;

        let totp = TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP,
            secret_bytes,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .map_err(|e| anyhow!("TOTP init error: {e}"))?;

        Ok(Enrollment {
            secret_base32: totp.get_secret_base32(),
            otpauth_uri: totp.get_url(),
        })
    }

    /// Checks a submitted code against the current time step. Malformed
    /// codes or undecodable secrets verify as `false`, never as an error.
    #[must_use]
    pub fn verify(&self, secret_base32: &str, code: &str) -> bool {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.verify_at(secret_base32, code, now)
    }

    /// Like [`verify`](Self::verify) with an explicit timestamp. Accepts the
    /// code for the step containing `timestamp` and the step before/after it.
    #[must_use]
    pub fn verify_at(&self, secret_base32: &str, code: &str, timestamp: u64) -> bool {
        let code = code.trim();
        if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        let Ok(secret_bytes) = Secret::Encoded(secret_base32.to_string()).to_bytes() else {
            return false;
        };

        // The account label is irrelevant for verification.
        let Ok(totp) = TOTP::new(
            Algorithm::SHA1,
            DIGITS,
            SKEW,
            STEP,
            secret_bytes,
            Some(self.issuer.clone()),
            "user".to_string(),
        ) else {
            return false;
        };

        totp.check(code, timestamp)
    }
}
