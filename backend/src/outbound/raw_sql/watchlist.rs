//! Raw SQL `WatchlistRepository`.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{PersistenceError, WatchlistRepository};
use crate::domain::{NewWatchlistEntry, WatchStatus, WatchlistEntry, WatchlistEntryUpdate};

use super::value::{SqlRow, SqlType, SqlValue, nullable};
use super::{Assignments, RawSqlExecutor, delete_by_id, fetch_all, fetch_one, fetch_optional};

const ENTRY_COLUMNS: &str =
    "id, user_id, movie_id, platform_id, status, watched_date, notes, created_at";

#[derive(Clone)]
pub struct RawWatchlistRepository {
    executor: Arc<dyn RawSqlExecutor>,
}

impl RawWatchlistRepository {
    pub fn new(executor: Arc<dyn RawSqlExecutor>) -> Self {
        Self { executor }
    }
}

fn entry_from_row(row: &SqlRow) -> Result<WatchlistEntry, PersistenceError> {
    let id = row.int("id")?;
    let stored_status = row.text("status")?;
    let status = stored_status.parse().unwrap_or_else(|_| {
        warn!(value = %stored_status, entry_id = id, "unrecognised watch status value, defaulting to to_watch");
        WatchStatus::ToWatch
    });
    Ok(WatchlistEntry {
        id,
        user_id: row.int("user_id")?,
        movie_id: row.int("movie_id")?,
        platform_id: row.opt_int("platform_id")?,
        status,
        watched_date: row.opt_timestamp("watched_date")?,
        notes: row.opt_text("notes")?,
        created_at: row.timestamp("created_at")?,
    })
}

#[async_trait]
impl WatchlistRepository for RawWatchlistRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM watchlist_entries WHERE id = $1");
        fetch_optional(
            self.executor.as_ref(),
            "find_watchlist_entry_by_id",
            &sql,
            &[SqlValue::Int(id)],
            entry_from_row,
        )
        .await
    }

    async fn find_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM watchlist_entries WHERE user_id = $1 AND movie_id = $2"
        );
        fetch_optional(
            self.executor.as_ref(),
            "find_watchlist_entry_for_pair",
            &sql,
            &[SqlValue::Int(user_id), SqlValue::Int(movie_id)],
            entry_from_row,
        )
        .await
    }

    async fn exists_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<bool, PersistenceError> {
        let present = fetch_optional(
            self.executor.as_ref(),
            "watchlist_entry_exists",
            "SELECT EXISTS (SELECT 1 FROM watchlist_entries WHERE user_id = $1 AND movie_id = $2) \
             AS present",
            &[SqlValue::Int(user_id), SqlValue::Int(movie_id)],
            |row| row.bool("present"),
        )
        .await?;
        Ok(present.unwrap_or(false))
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<WatchlistEntry>, PersistenceError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM watchlist_entries WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        );
        fetch_all(
            self.executor.as_ref(),
            "list_watchlist_entries",
            &sql,
            &[SqlValue::Int(user_id)],
            entry_from_row,
        )
        .await
    }

    async fn insert(&self, entry: &NewWatchlistEntry) -> Result<WatchlistEntry, PersistenceError> {
        let sql = format!(
            "INSERT INTO watchlist_entries (user_id, movie_id, platform_id, status, watched_date, notes) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ENTRY_COLUMNS}"
        );
        let params = [
            SqlValue::Int(entry.user_id),
            SqlValue::Int(entry.movie_id),
            nullable(entry.platform_id, SqlType::Int),
            SqlValue::from(entry.status.as_str()),
            nullable(entry.watched_date, SqlType::Timestamp),
            nullable(entry.notes.clone(), SqlType::Text),
        ];
        fetch_one(
            self.executor.as_ref(),
            "insert_watchlist_entry",
            &sql,
            &params,
            entry_from_row,
        )
        .await
    }

    async fn update(
        &self,
        id: i32,
        changes: &WatchlistEntryUpdate,
    ) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let mut assignments = Assignments::default();
        if let Some(status) = changes.status {
            assignments.set("status", SqlValue::from(status.as_str()));
        }
        if let Some(platform_id) = changes.platform_id {
            assignments.set("platform_id", nullable(platform_id, SqlType::Int));
        }
        if let Some(watched_date) = changes.watched_date {
            assignments.set("watched_date", nullable(watched_date, SqlType::Timestamp));
        }
        if let Some(notes) = &changes.notes {
            assignments.set("notes", nullable(notes.clone(), SqlType::Text));
        }
        if assignments.is_empty() {
            return self.find_by_id(id).await;
        }

        let (sql, params) = assignments.into_statement("watchlist_entries", id, ENTRY_COLUMNS);
        fetch_optional(
            self.executor.as_ref(),
            "update_watchlist_entry",
            &sql,
            &params,
            entry_from_row,
        )
        .await
    }

    async fn delete(&self, id: i32) -> Result<bool, PersistenceError> {
        delete_by_id(
            self.executor.as_ref(),
            "delete_watchlist_entry",
            "watchlist_entries",
            id,
        )
        .await
    }
}
