//! Movie operations. Creation is idempotent on `tmdb_id`.

use tracing::{debug, warn};

use super::fallback::run_tiers;
use super::{StorageError, StorageGateway, degraded_read};
use crate::domain::ports::{ErrorClass, PersistenceError};
use crate::domain::{Movie, NewMovie};

impl StorageGateway {
    pub async fn get_movie(&self, id: i32) -> Option<Movie> {
        run_tiers("get_movie", self.relational(|t| t.movies.clone()), |movies| async move {
            movies.find_by_id(id).await
        })
        .await
        .unwrap_or_else(|error| {
            degraded_read("get_movie", &error);
            None
        })
    }

    pub async fn get_movie_by_tmdb_id(&self, tmdb_id: i32) -> Option<Movie> {
        run_tiers(
            "get_movie_by_tmdb_id",
            self.relational(|t| t.movies.clone()),
            |movies| async move { movies.find_by_tmdb_id(tmdb_id).await },
        )
        .await
        .unwrap_or_else(|error| {
            degraded_read("get_movie_by_tmdb_id", &error);
            None
        })
    }

    /// Cache a catalog title, returning the stored row.
    ///
    /// Creating a movie whose `tmdb_id` is already stored returns the
    /// existing row rather than an error.
    pub async fn create_movie(&self, movie: NewMovie) -> Result<Movie, StorageError> {
        let movie = &movie;
        let error = match self.orm.movies.insert(movie).await {
            Ok(created) => return Ok(created),
            Err(error) => error,
        };

        let error = match error.class() {
            ErrorClass::Conflict => return self.existing_movie(movie.tmdb_id).await,
            ErrorClass::Other => error,
            ErrorClass::ConnectionFailure => match self.raw.as_ref() {
                Some(raw) => {
                    warn!(operation = "create_movie", tier = self.orm.name(), %error, "retrying insert on raw SQL tier");
                    match raw.movies.insert(movie).await {
                        Ok(created) => return Ok(created),
                        Err(raw_error) if raw_error.class() == ErrorClass::Conflict => {
                            return self.existing_movie(movie.tmdb_id).await;
                        }
                        Err(raw_error) => raw_error,
                    }
                }
                None => error,
            },
        };

        self.recheck_movie(movie.tmdb_id, error).await
    }

    /// Resolve a `tmdb_id` conflict by returning the stored row.
    async fn existing_movie(&self, tmdb_id: i32) -> Result<Movie, StorageError> {
        debug!(operation = "create_movie", tmdb_id, "movie already cached; fetching existing row");
        self.get_movie_by_tmdb_id(tmdb_id)
            .await
            .ok_or_else(|| StorageError::duplicate_tmdb_id(tmdb_id))
    }

    /// Last existence check before surfacing a write failure.
    async fn recheck_movie(
        &self,
        tmdb_id: i32,
        error: PersistenceError,
    ) -> Result<Movie, StorageError> {
        match self.get_movie_by_tmdb_id(tmdb_id).await {
            Some(existing) => {
                debug!(operation = "create_movie", tmdb_id, %error, "insert failed but movie exists");
                Ok(existing)
            }
            None => Err(StorageError::from_persistence("create_movie", error)),
        }
    }
}
