//! Port abstraction for user-owned platforms.
use async_trait::async_trait;

use crate::domain::{NewPlatform, Platform, PlatformUpdate};

use super::PersistenceError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlatformRepository: Send + Sync {
    /// Fetch a platform by identifier.
    async fn find_by_id(&self, id: i32) -> Result<Option<Platform>, PersistenceError>;

    /// List a user's platforms ordered by identifier.
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Platform>, PersistenceError>;

    /// Insert a platform and return the stored row.
    async fn insert(&self, platform: &NewPlatform) -> Result<Platform, PersistenceError>;

    /// Apply a partial update; `None` when no row has the identifier.
    async fn update(
        &self,
        id: i32,
        changes: &PlatformUpdate,
    ) -> Result<Option<Platform>, PersistenceError>;

    /// Delete a platform; `true` when a row was removed.
    async fn delete(&self, id: i32) -> Result<bool, PersistenceError>;
}
