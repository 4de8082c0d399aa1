//! PostgreSQL-backed `PlatformRepository` using Diesel.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use crate::domain::ports::{PersistenceError, PlatformRepository};
use crate::domain::{NewPlatform, Platform, PlatformUpdate};

use super::diesel_helpers::{map_diesel_error, map_pool_error};
use super::models::{NewPlatformRow, PlatformChangeset, PlatformRow};
use super::pool::DbPool;
use super::schema::platforms;

#[derive(Clone)]
pub struct DieselPlatformRepository {
    pool: DbPool,
}

impl DieselPlatformRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlatformRepository for DieselPlatformRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Platform>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = platforms::table
            .find(id)
            .select(PlatformRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(Platform::from))
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Platform>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let rows = platforms::table
            .filter(platforms::user_id.eq(user_id))
            .order(platforms::id.asc())
            .select(PlatformRow::as_select())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(rows.into_iter().map(Platform::from).collect())
    }

    async fn insert(&self, platform: &NewPlatform) -> Result<Platform, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        diesel::insert_into(platforms::table)
            .values(NewPlatformRow::from(platform))
            .returning(PlatformRow::as_returning())
            .get_result(&mut conn)
            .await
            .map(Platform::from)
            .map_err(map_diesel_error)
    }

    async fn update(
        &self,
        id: i32,
        changes: &PlatformUpdate,
    ) -> Result<Option<Platform>, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let row = diesel::update(platforms::table.find(id))
            .set(PlatformChangeset::from(changes))
            .returning(PlatformRow::as_returning())
            .get_result(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;

        Ok(row.map(Platform::from))
    }

    async fn delete(&self, id: i32) -> Result<bool, PersistenceError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;

        let deleted = diesel::delete(platforms::table.find(id))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        Ok(deleted > 0)
    }
}
