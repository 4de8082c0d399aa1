//! Watchlist entries: the relationship between a user and a catalog title.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::movie::Movie;

/// Viewing progress for a watchlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    #[default]
    ToWatch,
    Watching,
    Watched,
}

impl WatchStatus {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ToWatch => "to_watch",
            Self::Watching => "watching",
            Self::Watched => "watched",
        }
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored status is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown watch status: {0}")]
pub struct ParseWatchStatusError(pub String);

impl FromStr for WatchStatus {
    type Err = ParseWatchStatusError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "to_watch" => Ok(Self::ToWatch),
            "watching" => Ok(Self::Watching),
            "watched" => Ok(Self::Watched),
            other => Err(ParseWatchStatusError(other.to_owned())),
        }
    }
}

/// One user's record of one title.
///
/// ## Invariants
/// - At most one entry exists per (`user_id`, `movie_id`); the schema enforces
///   it with a unique constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistEntry {
    pub id: i32,
    pub user_id: i32,
    pub movie_id: i32,
    pub platform_id: Option<i32>,
    pub status: WatchStatus,
    pub watched_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insertable subset of [`WatchlistEntry`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewWatchlistEntry {
    pub user_id: i32,
    pub movie_id: i32,
    pub platform_id: Option<i32>,
    pub status: WatchStatus,
    pub watched_date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl NewWatchlistEntry {
    /// A `to_watch` entry without platform or notes.
    pub fn new(user_id: i32, movie_id: i32) -> Self {
        Self {
            user_id,
            movie_id,
            ..Self::default()
        }
    }

    /// Attach free-text notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Set the initial status.
    pub fn with_status(mut self, status: WatchStatus) -> Self {
        self.status = status;
        self
    }
}

/// Partial update for an entry.
///
/// Nested options distinguish "leave untouched" (`None`) from "clear"
/// (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchlistEntryUpdate {
    pub status: Option<WatchStatus>,
    pub platform_id: Option<Option<i32>>,
    pub watched_date: Option<Option<DateTime<Utc>>>,
    pub notes: Option<Option<String>>,
}

impl WatchlistEntryUpdate {
    /// True when the update would not change any column.
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.platform_id.is_none()
            && self.watched_date.is_none()
            && self.notes.is_none()
    }

    /// Stamp `watched_date` when moving to `watched` without an explicit date.
    pub fn stamped(mut self, now: DateTime<Utc>) -> Self {
        if self.status == Some(WatchStatus::Watched) && self.watched_date.is_none() {
            self.watched_date = Some(Some(now));
        }
        self
    }
}

/// Entry joined with its resolved catalog title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub movie: Movie,
}
