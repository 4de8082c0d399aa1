//! Port abstraction for user persistence adapters.
use async_trait::async_trait;

use crate::domain::{NewUser, User, UserUpdate};

use super::PersistenceError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user by identifier.
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, PersistenceError>;

    /// Fetch a user by username, ignoring case.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, PersistenceError>;

    /// List every user ordered by identifier.
    async fn list(&self) -> Result<Vec<User>, PersistenceError>;

    /// Insert a user and return the stored row.
    ///
    /// A clashing username fails with [`PersistenceError::UniqueViolation`].
    async fn insert(&self, user: &NewUser) -> Result<User, PersistenceError>;

    /// Apply a partial update; `None` when no row has the identifier.
    async fn update(&self, id: i32, changes: &UserUpdate)
    -> Result<Option<User>, PersistenceError>;
}
