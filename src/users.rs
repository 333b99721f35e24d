//! In-memory user list.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// A stored user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    /// Sequential identifier, starting at 1.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Email address.
    pub email: String,
}

/// Body of `POST /users`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
}

impl NewUser {
    /// Presence check on both fields.
    fn into_fields(self) -> Result<(String, String), ApiError> {
        match (self.name, self.email) {
            (Some(name), Some(email)) if !name.trim().is_empty() && !email.trim().is_empty() => {
                Ok((name, email))
            }
            _ => Err(ApiError::Validation("Name and email are required".to_string())),
        }
    }
}

/// Concurrent user store. Not persisted.
#[derive(Debug)]
pub struct UserStore {
    users: DashMap<u64, User>,
    next_id: AtomicU64,
}

impl UserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create a store holding the two demo users.
    pub fn seeded() -> Self {
        let store = Self::new();
        store.insert("John Doe".to_string(), "john@example.com".to_string());
        store.insert("Jane Smith".to_string(), "jane@example.com".to_string());
        store
    }

    fn insert(&self, name: String, email: String) -> User {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let user = User { id, name, email };
        self.users.insert(id, user.clone());
        user
    }

    /// All users ordered by id.
    pub fn list(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|r| r.value().clone()).collect();
        users.sort_by_key(|u| u.id);
        users
    }

    /// Look up a user by id.
    pub fn get(&self, id: u64) -> Option<User> {
        self.users.get(&id).map(|r| r.value().clone())
    }

    /// Validate and store a new user.
    pub fn create(&self, new_user: NewUser) -> Result<User, ApiError> {
        let (name, email) = new_user.into_fields()?;
        Ok(self.insert(name, email))
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl Default for UserStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str, email: &str) -> NewUser {
        NewUser {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
        }
    }

    #[test]
    fn seeded_store_lists_demo_users() {
        let store = UserStore::seeded();
        let users = store.list();

        assert_eq!(users.len(), 2);
        assert_eq!(users[0].name, "John Doe");
        assert_eq!(users[1].id, 2);
    }

    #[test]
    fn create_assigns_next_id() {
        let store = UserStore::seeded();
        let user = store.create(new_user("Ada", "ada@example.com")).unwrap();

        assert_eq!(user.id, 3);
        assert_eq!(store.get(3), Some(user));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn create_requires_name_and_email() {
        let store = UserStore::new();

        assert!(store.create(NewUser::default()).is_err());
        assert!(store.create(new_user("", "a@example.com")).is_err());
        assert!(store.create(new_user("Ada", "   ")).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn get_unknown_id_is_none() {
        assert!(UserStore::seeded().get(99).is_none());
    }
}
