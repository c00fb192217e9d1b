//! In-memory user store.
//!
//! Stands in for the relational repository: the gate reaches it only through
//! [`UserLookup`], route handlers through its inherent methods. Deleted and
//! disabled users stay in the map but are invisible to lookups.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use authn_auth::{AuthUser, LookupError, UserLookup};
use authn_core::UserId;
use authn_events::UserSnapshot;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("user with email `{0}` already exists")]
    DuplicateEmail(String),

    #[error("user not found")]
    NotFound,

    #[error("user store lock poisoned")]
    Poisoned,
}

#[derive(Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub disabled: bool,
}

impl UserRecord {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none() && !self.disabled
    }

    pub fn snapshot(&self) -> UserSnapshot {
        UserSnapshot {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

impl core::fmt::Debug for UserRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("UserRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("deleted_at", &self.deleted_at)
            .field("disabled", &self.disabled)
            .finish_non_exhaustive()
    }
}

impl AuthUser for UserRecord {
    fn id(&self) -> UserId {
        self.id
    }

    fn email(&self) -> &str {
        &self.email
    }

    fn password_hash(&self) -> &str {
        &self.password_hash
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user; emails are unique among users that are not deleted.
    pub fn insert(&self, new: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;

        let taken = users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email.eq_ignore_ascii_case(&new.email));
        if taken {
            return Err(StoreError::DuplicateEmail(new.email));
        }

        let record = UserRecord {
            id: UserId::new(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            created_at: Utc::now(),
            deleted_at: None,
            disabled: false,
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    /// Email registered to any user that is not deleted (disabled included).
    pub fn email_taken(&self, email: &str) -> Result<bool, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users
            .values()
            .any(|u| u.deleted_at.is_none() && u.email.eq_ignore_ascii_case(email)))
    }

    /// Active user by email.
    pub fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users
            .values()
            .find(|u| u.is_active() && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    pub fn get(&self, id: UserId) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().map_err(|_| StoreError::Poisoned)?;
        Ok(users.get(&id).cloned())
    }

    /// Soft delete.
    pub fn delete(&self, id: UserId) -> Result<(), StoreError> {
        self.update(id, |u| u.deleted_at = Some(Utc::now()))
    }

    pub fn disable(&self, id: UserId) -> Result<(), StoreError> {
        self.update(id, |u| u.disabled = true)
    }

    pub fn enable(&self, id: UserId) -> Result<(), StoreError> {
        self.update(id, |u| u.disabled = false)
    }

    fn update(&self, id: UserId, f: impl FnOnce(&mut UserRecord)) -> Result<(), StoreError> {
        let mut users = self.users.write().map_err(|_| StoreError::Poisoned)?;
        let user = users
            .get_mut(&id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or(StoreError::NotFound)?;
        f(user);
        Ok(())
    }
}

#[async_trait]
impl UserLookup for InMemoryUserStore {
    type User = UserRecord;

    async fn exists_by_identity(&self, identity: &str) -> bool {
        matches!(self.find_by_email(identity), Ok(Some(_)))
    }

    async fn get_by_identity(&self, identity: &str) -> Result<UserRecord, LookupError> {
        match self.find_by_email(identity) {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(LookupError::NotFound),
            Err(e) => Err(LookupError::Other(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ada Lovelace".into(),
            email: email.into(),
            password_hash: "$argon2id$stub".into(),
        }
    }

    #[test]
    fn duplicate_email_is_rejected_case_insensitively() {
        let store = InMemoryUserStore::new();
        store.insert(new_user("ada@example.com")).unwrap();
        assert_eq!(
            store.insert(new_user("ADA@example.com")),
            Err(StoreError::DuplicateEmail("ADA@example.com".into()))
        );
    }

    #[test]
    fn deleted_email_can_be_registered_again() {
        let store = InMemoryUserStore::new();
        let first = store.insert(new_user("ada@example.com")).unwrap();
        store.delete(first.id).unwrap();

        let second = store.insert(new_user("ada@example.com")).unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(store.delete(first.id), Err(StoreError::NotFound));
    }

    #[tokio::test]
    async fn lookup_hides_deleted_and_disabled_users() {
        let store = InMemoryUserStore::new();
        let deleted = store.insert(new_user("gone@example.com")).unwrap();
        let disabled = store.insert(new_user("off@example.com")).unwrap();
        let active = store.insert(new_user("on@example.com")).unwrap();
        store.delete(deleted.id).unwrap();
        store.disable(disabled.id).unwrap();

        assert!(!store.exists_by_identity("gone@example.com").await);
        assert!(!store.exists_by_identity("off@example.com").await);
        assert_eq!(
            store.get_by_identity("off@example.com").await,
            Err(LookupError::NotFound)
        );
        assert_eq!(store.get_by_identity("on@example.com").await.unwrap().id, active.id);

        store.enable(disabled.id).unwrap();
        assert!(store.exists_by_identity("off@example.com").await);
    }

    #[test]
    fn debug_output_omits_the_password_hash() {
        let store = InMemoryUserStore::new();
        let user = store.insert(new_user("ada@example.com")).unwrap();
        assert!(!format!("{user:?}").contains("argon2"));
    }
}
