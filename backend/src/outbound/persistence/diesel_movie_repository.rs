//! PostgreSQL-backed `MovieRepository` using Diesel.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{MovieRepository, PersistenceError};
use crate::domain::{Movie, NewMovie};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{MovieRow, NewMovieRow};
use super::pool::DbPool;
use super::schema::movies;

/// Diesel-backed movie cache.
#[derive(Clone)]
pub struct DieselMovieRepository {
    pool: DbPool,
}

impl DieselMovieRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MovieRepository for DieselMovieRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Movie>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = movies::table
            .find(id)
            .select(MovieRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(Movie::from))
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<Movie>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = movies::table
            .filter(movies::tmdb_id.eq(tmdb_id))
            .select(MovieRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(Movie::from))
    }

    async fn insert(&self, movie: &NewMovie) -> Result<Movie, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(movies::table)
            .values(NewMovieRow::from(movie))
            .returning(MovieRow::as_returning())
            .get_result(&mut conn)
            .await
            .map(Movie::from)
            .map_err(map_diesel_error)
    }
}
