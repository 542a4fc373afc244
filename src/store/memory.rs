//! In-memory user store, used by the flow tests and local experiments.

use anyhow::Result;
use async_trait::async_trait;
use std::sync::{Mutex, PoisonError};
use uuid::Uuid;

use super::{CreateOutcome, NewUser, UserRecord, UserStore};

#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: Mutex<Vec<UserRecord>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(users.iter().find(|user| user.email == email).cloned())
    }

    async fn create(&self, user: NewUser) -> Result<CreateOutcome> {
        // Check and insert under one lock so duplicates cannot slip through.
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        if users.iter().any(|existing| existing.email == user.email) {
            return Ok(CreateOutcome::Duplicate);
        }
        let record = UserRecord {
            id: Uuid::new_v4(),
            email: user.email,
            username: user.username,
            password: user.password,
            grado: user.grado,
            grupo: user.grupo,
            otp_secret: user.otp_secret,
        };
        users.push(record.clone());
        Ok(CreateOutcome::Created(record))
    }

    async fn update_password(&self, id: Uuid, new_hash: &str) -> Result<bool> {
        let mut users = self.users.lock().unwrap_or_else(PoisonError::into_inner);
        match users.iter_mut().find(|user| user.id == id) {
            Some(user) => {
                user.password = new_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(email: &str) -> NewUser {
        NewUser {
            email: email.to_string(),
            username: "ada".to_string(),
            password: "$2b$10$hash".to_string(),
            grado: "5".to_string(),
            grupo: "B".to_string(),
            otp_secret: "JBSWY3DPEHPK3PXP".to_string(),
        }
    }

    #[tokio::test]
    async fn create_then_find() -> Result<()> {
        let store = MemoryUserStore::new();
        let outcome = store.create(sample("a@school.edu")).await?;
        assert!(matches!(outcome, CreateOutcome::Created(_)));

        let found = store.find_by_email("a@school.edu").await?;
        assert_eq!(found.map(|user| user.username).as_deref(), Some("ada"));
        assert!(store.find_by_email("b@school.edu").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() -> Result<()> {
        let store = MemoryUserStore::new();
        store.create(sample("a@school.edu")).await?;
        let outcome = store.create(sample("a@school.edu")).await?;
        assert!(matches!(outcome, CreateOutcome::Duplicate));
        Ok(())
    }

    #[tokio::test]
    async fn update_password_replaces_hash() -> Result<()> {
        let store = MemoryUserStore::new();
        let CreateOutcome::Created(record) = store.create(sample("a@school.edu")).await? else {
            panic!("expected creation");
        };

        assert!(store.update_password(record.id, "$2b$10$other").await?);
        let found = store.find_by_email("a@school.edu").await?;
        assert_eq!(found.map(|user| user.password).as_deref(), Some("$2b$10$other"));

        assert!(!store.update_password(Uuid::new_v4(), "$2b$10$x").await?);
        Ok(())
    }
}
