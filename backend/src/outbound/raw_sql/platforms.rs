//! Raw SQL `PlatformRepository`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{PersistenceError, PlatformRepository};
use crate::domain::{NewPlatform, Platform, PlatformUpdate};

use super::value::{SqlRow, SqlType, SqlValue, nullable};
use super::{Assignments, RawSqlExecutor, delete_by_id, fetch_all, fetch_one, fetch_optional};

const PLATFORM_COLUMNS: &str = "id, user_id, name, logo_url, is_default, created_at";

#[derive(Clone)]
pub struct RawPlatformRepository {
    executor: Arc<dyn RawSqlExecutor>,
}

impl RawPlatformRepository {
    pub fn new(executor: Arc<dyn RawSqlExecutor>) -> Self {
        Self { executor }
    }
}

fn platform_from_row(row: &SqlRow) -> Result<Platform, PersistenceError> {
    Ok(Platform {
        id: row.int("id")?,
        user_id: row.int("user_id")?,
        name: row.text("name")?,
        logo_url: row.opt_text("logo_url")?,
        is_default: row.bool("is_default")?,
        created_at: row.timestamp("created_at")?,
    })
}

#[async_trait]
impl PlatformRepository for RawPlatformRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Platform>, PersistenceError> {
        let sql = format!("SELECT {PLATFORM_COLUMNS} FROM platforms WHERE id = $1");
        fetch_optional(
            self.executor.as_ref(),
            "find_platform_by_id",
            &sql,
            &[SqlValue::Int(id)],
            platform_from_row,
        )
        .await
    }

    async fn list_for_user(&self, user_id: i32) -> Result<Vec<Platform>, PersistenceError> {
        let sql = format!("SELECT {PLATFORM_COLUMNS} FROM platforms WHERE user_id = $1 ORDER BY id");
        fetch_all(
            self.executor.as_ref(),
            "list_platforms",
            &sql,
            &[SqlValue::Int(user_id)],
            platform_from_row,
        )
        .await
    }

    async fn insert(&self, platform: &NewPlatform) -> Result<Platform, PersistenceError> {
        let sql = format!(
            "INSERT INTO platforms (user_id, name, logo_url, is_default) \
             VALUES ($1, $2, $3, $4) RETURNING {PLATFORM_COLUMNS}"
        );
        let params = [
            SqlValue::Int(platform.user_id),
            SqlValue::from(platform.name.as_str()),
            nullable(platform.logo_url.clone(), SqlType::Text),
            SqlValue::Bool(platform.is_default),
        ];
        fetch_one(self.executor.as_ref(), "insert_platform", &sql, &params, platform_from_row).await
    }

    async fn update(
        &self,
        id: i32,
        changes: &PlatformUpdate,
    ) -> Result<Option<Platform>, PersistenceError> {
        let mut assignments = Assignments::default();
        if let Some(name) = &changes.name {
            assignments.set("name", SqlValue::from(name.as_str()));
        }
        if let Some(logo_url) = &changes.logo_url {
            assignments.set("logo_url", nullable(logo_url.clone(), SqlType::Text));
        }
        if let Some(is_default) = changes.is_default {
            assignments.set("is_default", SqlValue::Bool(is_default));
        }
        if assignments.is_empty() {
            return self.find_by_id(id).await;
        }

        let (sql, params) = assignments.into_statement("platforms", id, PLATFORM_COLUMNS);
        fetch_optional(
            self.executor.as_ref(),
            "update_platform",
            &sql,
            &params,
            platform_from_row,
        )
        .await
    }

    async fn delete(&self, id: i32) -> Result<bool, PersistenceError> {
        delete_by_id(self.executor.as_ref(), "delete_platform", "platforms", id).await
    }
}
