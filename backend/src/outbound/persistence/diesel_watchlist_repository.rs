//! PostgreSQL-backed `WatchlistRepository` using Diesel.
//!
//! Inserts rely on the `(user_id, movie_id)` unique constraint; a race
//! between two creators surfaces as a unique violation the gateway resolves.

use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PersistenceError, WatchlistRepository};
use crate::domain::{NewWatchlistEntry, WatchlistEntry, WatchlistEntryUpdate};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{NewWatchlistEntryRow, WatchlistEntryChangeset, WatchlistEntryRow};
use super::pool::DbPool;
use super::schema::watchlist_entries;

#[derive(Clone)]
pub struct DieselWatchlistRepository {
    pool: DbPool,
}

impl DieselWatchlistRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WatchlistRepository for DieselWatchlistRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = watchlist_entries::table
            .find(id)
            .select(WatchlistEntryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(WatchlistEntry::from))
    }

    async fn find_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = watchlist_entries::table
            .filter(watchlist_entries::user_id.eq(user_id))
            .filter(watchlist_entries::movie_id.eq(movie_id))
            .select(WatchlistEntryRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(WatchlistEntry::from))
    }

    async fn exists_for_pair(
        &self,
        user_id: i32,
        movie_id: i32,
    ) -> Result<bool, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::select(exists(
            watchlist_entries::table
                .filter(watchlist_entries::user_id.eq(user_id))
                .filter(watchlist_entries::movie_id.eq(movie_id)),
        ))
        .get_result(&mut conn)
        .await
        .map_err(map_diesel_error)
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<WatchlistEntry>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows = watchlist_entries::table
            .filter(watchlist_entries::user_id.eq(user_id))
            .order((
                watchlist_entries::created_at.desc(),
                watchlist_entries::id.desc(),
            ))
            .select(WatchlistEntryRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows.into_iter().map(WatchlistEntry::from).collect())
    }

    async fn insert(&self, entry: &NewWatchlistEntry) -> Result<WatchlistEntry, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(watchlist_entries::table)
            .values(NewWatchlistEntryRow::from(entry))
            .returning(WatchlistEntryRow::as_returning())
            .get_result(&mut conn)
            .await
            .map(WatchlistEntry::from)
            .map_err(map_diesel_error)
    }

    async fn update(
        &self,
        id: i32,
        changes: &WatchlistEntryUpdate,
    ) -> Result<Option<WatchlistEntry>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = diesel::update(watchlist_entries::table.find(id))
            .set(WatchlistEntryChangeset::from(changes))
            .returning(WatchlistEntryRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(WatchlistEntry::from))
    }

    async fn delete(&self, id: i32) -> Result<bool, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(watchlist_entries::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(deleted > 0)
    }
}
