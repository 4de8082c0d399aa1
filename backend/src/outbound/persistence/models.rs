//! Internal Diesel row structs.
//!
//! These types never leave the persistence layer; repositories convert them
//! to domain entities before returning.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::warn;

use crate::domain::{
    MediaType, Movie, NewMovie, NewPlatform, NewUser, NewWatchlistEntry, Platform,
    PlatformUpdate, User, UserUpdate, WatchStatus, WatchlistEntry, WatchlistEntryUpdate,
};

use super::schema::{movies, platforms, users, watchlist_entries};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct UserRow {
    pub id: i32,
    pub username: String,
    pub password: String,
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub environment: Option<String>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            password: row.password,
            display_name: row.display_name,
            created_at: row.created_at,
            environment: row.environment,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub(crate) struct NewUserRow<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub display_name: Option<&'a str>,
    pub environment: Option<&'a str>,
}

impl<'a> From<&'a NewUser> for NewUserRow<'a> {
    fn from(user: &'a NewUser) -> Self {
        Self {
            username: &user.username,
            password: &user.password,
            display_name: user.display_name.as_deref(),
            environment: user.environment.as_deref(),
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = users)]
pub(crate) struct UserChangeset<'a> {
    pub password: Option<&'a str>,
    pub display_name: Option<Option<&'a str>>,
}

impl<'a> From<&'a UserUpdate> for UserChangeset<'a> {
    fn from(update: &'a UserUpdate) -> Self {
        Self {
            password: update.password.as_deref(),
            display_name: update.display_name.as_ref().map(Option::as_deref),
        }
    }
}

// ---------------------------------------------------------------------------
// Movies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = movies)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct MovieRow {
    pub id: i32,
    pub tmdb_id: i32,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub genres: Vec<String>,
    pub media_type: String,
    pub runtime: Option<i32>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
}

impl From<MovieRow> for Movie {
    fn from(row: MovieRow) -> Self {
        let media_type = row.media_type.parse().unwrap_or_else(|_| {
            warn!(
                value = %row.media_type,
                movie_id = row.id,
                "unrecognised media_type value, defaulting to movie"
            );
            MediaType::Movie
        });
        Self {
            id: row.id,
            tmdb_id: row.tmdb_id,
            title: row.title,
            overview: row.overview,
            poster_path: row.poster_path,
            backdrop_path: row.backdrop_path,
            release_date: row.release_date,
            vote_average: row.vote_average,
            genres: row.genres,
            media_type,
            runtime: row.runtime,
            number_of_seasons: row.number_of_seasons,
            number_of_episodes: row.number_of_episodes,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = movies)]
pub(crate) struct NewMovieRow<'a> {
    pub tmdb_id: i32,
    pub title: &'a str,
    pub overview: Option<&'a str>,
    pub poster_path: Option<&'a str>,
    pub backdrop_path: Option<&'a str>,
    pub release_date: Option<&'a str>,
    pub vote_average: Option<f64>,
    pub genres: &'a [String],
    pub media_type: &'static str,
    pub runtime: Option<i32>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
}

impl<'a> From<&'a NewMovie> for NewMovieRow<'a> {
    fn from(movie: &'a NewMovie) -> Self {
        Self {
            tmdb_id: movie.tmdb_id,
            title: &movie.title,
            overview: movie.overview.as_deref(),
            poster_path: movie.poster_path.as_deref(),
            backdrop_path: movie.backdrop_path.as_deref(),
            release_date: movie.release_date.as_deref(),
            vote_average: movie.vote_average,
            genres: &movie.genres,
            media_type: movie.media_type.as_str(),
            runtime: movie.runtime,
            number_of_seasons: movie.number_of_seasons,
            number_of_episodes: movie.number_of_episodes,
        }
    }
}

// ---------------------------------------------------------------------------
// Platforms
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = platforms)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct PlatformRow {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub logo_url: Option<String>,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl From<PlatformRow> for Platform {
    fn from(row: PlatformRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            logo_url: row.logo_url,
            is_default: row.is_default,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = platforms)]
pub(crate) struct NewPlatformRow<'a> {
    pub user_id: i32,
    pub name: &'a str,
    pub logo_url: Option<&'a str>,
    pub is_default: bool,
}

impl<'a> From<&'a NewPlatform> for NewPlatformRow<'a> {
    fn from(platform: &'a NewPlatform) -> Self {
        Self {
            user_id: platform.user_id,
            name: &platform.name,
            logo_url: platform.logo_url.as_deref(),
            is_default: platform.is_default,
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = platforms)]
pub(crate) struct PlatformChangeset<'a> {
    pub name: Option<&'a str>,
    pub logo_url: Option<Option<&'a str>>,
    pub is_default: Option<bool>,
}

impl<'a> From<&'a PlatformUpdate> for PlatformChangeset<'a> {
    fn from(update: &'a PlatformUpdate) -> Self {
        Self {
            name: update.name.as_deref(),
            logo_url: update.logo_url.as_ref().map(Option::as_deref),
            is_default: update.is_default,
        }
    }
}

// ---------------------------------------------------------------------------
// Watchlist entries
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = watchlist_entries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct WatchlistEntryRow {
    pub id: i32,
    pub user_id: i32,
    pub movie_id: i32,
    pub platform_id: Option<i32>,
    pub status: String,
    pub watched_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WatchlistEntryRow> for WatchlistEntry {
    fn from(row: WatchlistEntryRow) -> Self {
        let status = row.status.parse().unwrap_or_else(|_| {
            warn!(
                value = %row.status,
                entry_id = row.id,
                "unrecognised watch status value, defaulting to to_watch"
            );
            WatchStatus::ToWatch
        });
        Self {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id,
            platform_id: row.platform_id,
            status,
            watched_date: row.watched_date,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = watchlist_entries)]
pub(crate) struct NewWatchlistEntryRow<'a> {
    pub user_id: i32,
    pub movie_id: i32,
    pub platform_id: Option<i32>,
    pub status: &'static str,
    pub watched_date: Option<DateTime<Utc>>,
    pub notes: Option<&'a str>,
}

impl<'a> From<&'a NewWatchlistEntry> for NewWatchlistEntryRow<'a> {
    fn from(entry: &'a NewWatchlistEntry) -> Self {
        Self {
            user_id: entry.user_id,
            movie_id: entry.movie_id,
            platform_id: entry.platform_id,
            status: entry.status.as_str(),
            watched_date: entry.watched_date,
            notes: entry.notes.as_deref(),
        }
    }
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = watchlist_entries)]
pub(crate) struct WatchlistEntryChangeset<'a> {
    pub status: Option<&'static str>,
    pub platform_id: Option<Option<i32>>,
    pub watched_date: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<&'a str>>,
}

impl<'a> From<&'a WatchlistEntryUpdate> for WatchlistEntryChangeset<'a> {
    fn from(update: &'a WatchlistEntryUpdate) -> Self {
        Self {
            status: update.status.map(WatchStatus::as_str),
            platform_id: update.platform_id,
            watched_date: update.watched_date,
            notes: update.notes.as_ref().map(Option::as_deref),
        }
    }
}
