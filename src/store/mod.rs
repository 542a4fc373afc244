//! User record repository, keyed by email.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

/// A stored user. `otp_secret` is written once at registration and never
/// rotated; `password` holds the bcrypt hash, never the plaintext.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub username: String,
    pub password: String,
    pub grado: String,
    pub grupo: String,
    pub otp_secret: String,
}

/// Fields for a new registration; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub grado: String,
    pub grupo: String,
    pub otp_secret: String,
}

/// Outcome when inserting a new user.
#[derive(Debug)]
pub enum CreateOutcome {
    Created(UserRecord),
    /// Another record already owns this email.
    Duplicate,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Insert a new user. Email uniqueness is enforced by the store itself,
    /// so concurrent registrations of the same email resolve to exactly one
    /// `Created` and the rest `Duplicate`.
    async fn create(&self, user: NewUser) -> Result<CreateOutcome>;

    /// Replace the password hash. Returns `false` if the user is gone.
    async fn update_password(&self, id: Uuid, new_hash: &str) -> Result<bool>;
}
