//! Raw SQL `MovieRepository`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{MovieRepository, PersistenceError};
use crate::domain::{MediaType, Movie, NewMovie};

use super::value::{SqlRow, SqlType, SqlValue, nullable};
use super::{RawSqlExecutor, fetch_one, fetch_optional};

const MOVIE_COLUMNS: &str = "id, tmdb_id, title, overview, poster_path, backdrop_path, \
    release_date, vote_average, genres, media_type, runtime, number_of_seasons, number_of_episodes";

#[derive(Clone)]
pub struct RawMovieRepository {
    executor: Arc<dyn RawSqlExecutor>,
}

impl RawMovieRepository {
    pub fn new(executor: Arc<dyn RawSqlExecutor>) -> Self {
        Self { executor }
    }
}

fn movie_from_row(row: &SqlRow) -> Result<Movie, PersistenceError> {
    let id = row.int("id")?;
    let stored_type = row.text("media_type")?;
    let media_type = stored_type.parse().unwrap_or_else(|_| {
        warn!(value = %stored_type, movie_id = id, "unrecognised media_type value, defaulting to movie");
        MediaType::Movie
    });
    Ok(Movie {
        id,
        tmdb_id: row.int("tmdb_id")?,
        title: row.text("title")?,
        overview: row.opt_text("overview")?,
        poster_path: row.opt_text("poster_path")?,
        backdrop_path: row.opt_text("backdrop_path")?,
        release_date: row.opt_text("release_date")?,
        vote_average: row.opt_float("vote_average")?,
        genres: row.opt_text_array("genres")?.unwrap_or_default(),
        media_type,
        runtime: row.opt_int("runtime")?,
        number_of_seasons: row.opt_int("number_of_seasons")?,
        number_of_episodes: row.opt_int("number_of_episodes")?,
    })
}

#[async_trait]
impl MovieRepository for RawMovieRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Movie>, PersistenceError> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE id = $1");
        fetch_optional(
            self.executor.as_ref(),
            "find_movie_by_id",
            &sql,
            &[SqlValue::Int(id)],
            movie_from_row,
        )
        .await
    }

    async fn find_by_tmdb_id(&self, tmdb_id: i32) -> Result<Option<Movie>, PersistenceError> {
        let sql = format!("SELECT {MOVIE_COLUMNS} FROM movies WHERE tmdb_id = $1");
        fetch_optional(
            self.executor.as_ref(),
            "find_movie_by_tmdb_id",
            &sql,
            &[SqlValue::Int(tmdb_id)],
            movie_from_row,
        )
        .await
    }

    async fn insert(&self, movie: &NewMovie) -> Result<Movie, PersistenceError> {
        let sql = format!(
            "INSERT INTO movies (tmdb_id, title, overview, poster_path, backdrop_path, \
             release_date, vote_average, genres, media_type, runtime, number_of_seasons, \
             number_of_episodes) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING {MOVIE_COLUMNS}"
        );
        let params = [
            SqlValue::Int(movie.tmdb_id),
            SqlValue::from(movie.title.as_str()),
            nullable(movie.overview.clone(), SqlType::Text),
            nullable(movie.poster_path.clone(), SqlType::Text),
            nullable(movie.backdrop_path.clone(), SqlType::Text),
            nullable(movie.release_date.clone(), SqlType::Text),
            nullable(movie.vote_average, SqlType::Float),
            SqlValue::TextArray(movie.genres.clone()),
            SqlValue::from(movie.media_type.as_str()),
            nullable(movie.runtime, SqlType::Int),
            nullable(movie.number_of_seasons, SqlType::Int),
            nullable(movie.number_of_episodes, SqlType::Int),
        ];
        fetch_one(self.executor.as_ref(), "insert_movie", &sql, &params, movie_from_row).await
    }
}
