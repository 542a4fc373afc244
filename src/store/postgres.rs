//! Postgres-backed user store.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::{CreateOutcome, NewUser, UserRecord, UserStore};

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the `users` table if missing. The unique index on `email` is
    /// what closes the lookup-then-insert race on concurrent registrations.
    ///
    /// # Errors
    /// Returns an error if the DDL fails.
    pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
        let query = r"
            CREATE TABLE IF NOT EXISTS users (
                id UUID PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                username TEXT NOT NULL,
                password TEXT NOT NULL,
                grado TEXT NOT NULL,
                grupo TEXT NOT NULL,
                otp_secret TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )
        ";
        sqlx::query(query)
            .execute(pool)
            .await
            .context("failed to create users table")?;
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        username: row.get("username"),
        password: row.get("password"),
        grado: row.get("grado"),
        grupo: row.get("grupo"),
        otp_secret: row.get("otp_secret"),
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let query = "SELECT id, email, username, password, grado, grupo, otp_secret FROM users WHERE email = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT"
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to lookup user by email")?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn create(&self, user: NewUser) -> Result<CreateOutcome> {
        let id = Uuid::new_v4();
        let query = r"
            INSERT INTO users (id, email, username, password, grado, grupo, otp_secret)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
        ";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT"
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.grado)
            .bind(&user.grupo)
            .bind(&user.otp_secret)
            .execute(&self.pool)
            .instrument(span)
            .await;

        match result {
            Ok(_) => Ok(CreateOutcome::Created(UserRecord {
                id,
                email: user.email,
                username: user.username,
                password: user.password,
                grado: user.grado,
                grupo: user.grupo,
                otp_secret: user.otp_secret,
            })),
            Err(err) if is_unique_violation(&err) => Ok(CreateOutcome::Duplicate),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn update_password(&self, id: Uuid, new_hash: &str) -> Result<bool> {
        let query = "UPDATE users SET password = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE"
        );
        let result = sqlx::query(query)
            .bind(id)
            .bind(new_hash)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to update password")?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::is_unique_violation;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("99999"),
        }));
        assert!(!is_unique_violation(&err));

        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }
}
