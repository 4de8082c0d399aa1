//! Port abstraction for the cached movie catalog.
use async_trait::async_trait;

use crate::domain::{Movie, NewMovie};

use super::PersistenceError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MovieRepository: Send + Sync {
    /// Fetch a movie by its local identifier.
    async fn find_by_id(&self, id: i32) -> Result<Option<Movie>, PersistenceError>;

    /// Fetch a movie by its external catalog identifier.
    async fn find_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<Movie>, PersistenceError>;

    /// Insert a catalog entry and return the stored row.
    ///
    /// An existing `tmdb_id` fails with [`PersistenceError::UniqueViolation`].
    async fn insert(&self, movie: &NewMovie) -> Result<Movie, PersistenceError>;
}
