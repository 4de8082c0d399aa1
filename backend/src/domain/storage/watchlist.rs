//! Watchlist entry operations.
//!
//! The `(user_id, movie_id)` unique constraint is the source of idempotency
//! truth. The existence check in `create_watchlist_entry` only saves a
//! round trip in the common case.

use chrono::Utc;
use futures_util::future::join_all;
use tracing::{debug, warn};

use super::fallback::run_tiers;
use super::{StorageError, StorageGateway, degraded_read};
use crate::domain::ports::{ErrorClass, PersistenceError};
use crate::domain::{
    NewWatchlistEntry, WatchStatus, WatchlistEntry, WatchlistEntryUpdate, WatchlistItem,
};

impl StorageGateway {
    /// Whether the user already tracks the movie. Never fails.
    pub async fn has_watchlist_entry(&self, user_id: i32, movie_id: i32) -> bool {
        run_tiers(
            "has_watchlist_entry",
            self.relational(|t| t.watchlist.clone()),
            |entries| async move { entries.exists_for_pair(user_id, movie_id).await },
        )
        .await
        .unwrap_or_else(|error| {
            degraded_read("has_watchlist_entry", &error);
            false
        })
    }

    pub async fn get_watchlist_entry(&self, id: i32) -> Option<WatchlistEntry> {
        run_tiers(
            "get_watchlist_entry",
            self.relational(|t| t.watchlist.clone()),
            |entries| async move { entries.find_by_id(id).await },
        )
        .await
        .unwrap_or_else(|error| {
            degraded_read("get_watchlist_entry", &error);
            None
        })
    }

    /// The entry for a `(user, movie)` pair, if any.
    pub async fn find_watchlist_entry(&self, user_id: i32, movie_id: i32) -> Option<WatchlistEntry> {
        run_tiers(
            "find_watchlist_entry",
            self.relational(|t| t.watchlist.clone()),
            |entries| async move { entries.find_for_pair(user_id, movie_id).await },
        )
        .await
        .unwrap_or_else(|error| {
            degraded_read("find_watchlist_entry", &error);
            None
        })
    }

    /// Track a movie for a user, returning the existing entry when the pair
    /// is already tracked.
    pub async fn create_watchlist_entry(
        &self,
        entry: NewWatchlistEntry,
    ) -> Result<WatchlistEntry, StorageError> {
        let (user_id, movie_id) = (entry.user_id, entry.movie_id);
        if self.has_watchlist_entry(user_id, movie_id).await {
            if let Some(existing) = self.find_watchlist_entry(user_id, movie_id).await {
                debug!(operation = "create_watchlist_entry", user_id, movie_id, "entry already tracked");
                return Ok(existing);
            }
        }

        let entry = &entry;
        let error = match self.orm.watchlist.insert(entry).await {
            Ok(created) => return Ok(created),
            Err(error) => error,
        };

        let error = match error.class() {
            ErrorClass::Conflict => return self.existing_entry(user_id, movie_id, error).await,
            ErrorClass::Other => error,
            ErrorClass::ConnectionFailure => match self.raw.as_ref() {
                Some(raw) => {
                    warn!(operation = "create_watchlist_entry", tier = self.orm.name(), %error, "retrying insert on raw SQL tier");
                    match raw.watchlist.insert(entry).await {
                        Ok(created) => return Ok(created),
                        Err(raw_error) if raw_error.class() == ErrorClass::Conflict => {
                            return self.existing_entry(user_id, movie_id, raw_error).await;
                        }
                        Err(raw_error) => raw_error,
                    }
                }
                None => error,
            },
        };

        self.existing_entry(user_id, movie_id, error).await
    }

    /// Re-fetch the entry for a pair before surfacing `error`.
    async fn existing_entry(
        &self,
        user_id: i32,
        movie_id: i32,
        error: PersistenceError,
    ) -> Result<WatchlistEntry, StorageError> {
        match self.find_watchlist_entry(user_id, movie_id).await {
            Some(existing) => {
                debug!(operation = "create_watchlist_entry", user_id, movie_id, %error, "resolved to existing entry");
                Ok(existing)
            }
            None => Err(StorageError::from_persistence("create_watchlist_entry", error)),
        }
    }

    /// A user's entries, newest first, each paired with its movie.
    ///
    /// Entries whose movie cannot be resolved are left out.
    pub async fn get_watchlist_entries(&self, user_id: i32) -> Vec<WatchlistItem> {
        let entries = run_tiers(
            "get_watchlist_entries",
            self.relational(|t| t.watchlist.clone()),
            |entries| async move { entries.list_for_user(user_id).await },
        )
        .await
        .unwrap_or_else(|error| {
            degraded_read("get_watchlist_entries", &error);
            Vec::new()
        });

        self.resolve_movies(entries).await
    }

    /// Like [`Self::get_watchlist_entries`], restricted to one status.
    pub async fn get_watchlist_entries_with_status(
        &self,
        user_id: i32,
        status: WatchStatus,
    ) -> Vec<WatchlistItem> {
        let mut items = self.get_watchlist_entries(user_id).await;
        items.retain(|item| item.entry.status == status);
        items
    }

    async fn resolve_movies(&self, entries: Vec<WatchlistEntry>) -> Vec<WatchlistItem> {
        let movies = join_all(entries.iter().map(|entry| self.get_movie(entry.movie_id))).await;
        entries
            .into_iter()
            .zip(movies)
            .filter_map(|(entry, movie)| match movie {
                Some(movie) => Some(WatchlistItem { entry, movie }),
                None => {
                    debug!(entry_id = entry.id, movie_id = entry.movie_id, "dropping entry with unresolved movie");
                    None
                }
            })
            .collect()
    }

    /// Apply a partial update. Moving to `watched` without a date stamps
    /// the current time.
    pub async fn update_watchlist_entry(
        &self,
        id: i32,
        changes: WatchlistEntryUpdate,
    ) -> Result<WatchlistEntry, StorageError> {
        if changes.is_empty() {
            return self
                .get_watchlist_entry(id)
                .await
                .ok_or_else(|| StorageError::not_found(format!("watchlist entry {id}")));
        }

        let changes = &changes.stamped(Utc::now());
        run_tiers(
            "update_watchlist_entry",
            self.relational(|t| t.watchlist.clone()),
            |entries| async move { entries.update(id, changes).await },
        )
        .await
        .map_err(|error| StorageError::from_persistence("update_watchlist_entry", error))?
        .ok_or_else(|| StorageError::not_found(format!("watchlist entry {id}")))
    }

    pub async fn delete_watchlist_entry(&self, id: i32) -> bool {
        run_tiers(
            "delete_watchlist_entry",
            self.relational(|t| t.watchlist.clone()),
            |entries| async move { entries.delete(id).await },
        )
        .await
        .unwrap_or_else(|error| {
            degraded_read("delete_watchlist_entry", &error);
            false
        })
    }
}
