//! Cached catalog entries keyed by their external catalog identifier.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of catalog title.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    #[default]
    Movie,
    Tv,
}

impl MediaType {
    /// Database representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a stored media type is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown media type: {0}")]
pub struct ParseMediaTypeError(pub String);

impl FromStr for MediaType {
    type Err = ParseMediaTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "movie" => Ok(Self::Movie),
            "tv" => Ok(Self::Tv),
            other => Err(ParseMediaTypeError(other.to_owned())),
        }
    }
}

/// Catalog entry cached locally.
///
/// ## Invariants
/// - `tmdb_id` identifies exactly one row; creating the same id again yields
///   the existing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: i32,
    pub tmdb_id: i32,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub genres: Vec<String>,
    pub media_type: MediaType,
    pub runtime: Option<i32>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
}

/// Insertable subset of [`Movie`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewMovie {
    pub tmdb_id: i32,
    pub title: String,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub backdrop_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub genres: Vec<String>,
    pub media_type: MediaType,
    pub runtime: Option<i32>,
    pub number_of_seasons: Option<i32>,
    pub number_of_episodes: Option<i32>,
}

impl NewMovie {
    /// Minimal catalog entry; descriptive fields default to empty.
    pub fn new(tmdb_id: i32, title: impl Into<String>, media_type: MediaType) -> Self {
        Self {
            tmdb_id,
            title: title.into(),
            media_type,
            ..Self::default()
        }
    }
}
