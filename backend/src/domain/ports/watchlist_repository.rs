//! Port abstraction for watchlist entry persistence.
//!
//! Adapters rely on the `(user_id, movie_id)` unique constraint: a second
//! insert for the same pair fails with [`PersistenceError::UniqueViolation`]
//! rather than creating a duplicate row.
use async_trait::async_trait;

use crate::domain::{NewWatchlistEntry, WatchlistEntry, WatchlistEntryUpdate};

use super::PersistenceError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WatchlistRepository: Send + Sync {
    /// Fetch an entry by identifier.
    async fn find_by_id(&self, id: i32) -> Result<Option<WatchlistEntry>, PersistenceError>;

    /// Fetch the entry linking `user_id` to `movie_id`, if any.
    async fn find_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<Option<WatchlistEntry>, PersistenceError>;

    /// Cheap existence query for a `(user_id, movie_id)` pair.
    async fn exists_for_pair(&self, user_id: i32, movie_id: i32)
    -> Result<bool, PersistenceError>;

    /// List a user's entries, newest first.
    async fn list_for_user(&self, user_id: i32) -> Result<Vec<WatchlistEntry>, PersistenceError>;

    /// Insert an entry and return the stored row.
    async fn insert(&self, entry: &NewWatchlistEntry) -> Result<WatchlistEntry, PersistenceError>;

    /// Apply a partial update; `None` when no row has the identifier.
    async fn update(
        &self,
        id: i32,
        changes: &WatchlistEntryUpdate,
    ) -> Result<Option<WatchlistEntry>, PersistenceError>;

    /// Delete an entry; `true` when a row was removed.
    async fn delete(&self, id: i32) -> Result<bool, PersistenceError>;
}
