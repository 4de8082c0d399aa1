//! Raw SQL `UserRepository`.

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::ports::{PersistenceError, UserRepository};
use crate::domain::{NewUser, User, UserUpdate};

use super::value::{SqlRow, SqlType, SqlValue, nullable};
use super::{Assignments, RawSqlExecutor, fetch_all, fetch_one, fetch_optional};

const USER_COLUMNS: &str = "id, username, password, display_name, created_at, environment";

#[derive(Clone)]
pub struct RawUserRepository {
    executor: Arc<dyn RawSqlExecutor>,
}

impl RawUserRepository {
    pub fn new(executor: Arc<dyn RawSqlExecutor>) -> Self {
        Self { executor }
    }
}

fn user_from_row(row: &SqlRow) -> Result<User, PersistenceError> {
    Ok(User {
        id: row.int("id")?,
        username: row.text("username")?,
        password: row.text("password")?,
        display_name: row.opt_text("display_name")?,
        created_at: row.timestamp("created_at")?,
        environment: row.opt_text("environment")?,
    })
}

#[async_trait]
impl UserRepository for RawUserRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<User>, PersistenceError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        fetch_optional(
            self.executor.as_ref(),
            "find_user_by_id",
            &sql,
            &[SqlValue::Int(id)],
            user_from_row,
        )
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, PersistenceError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(username) = LOWER($1)");
        fetch_optional(
            self.executor.as_ref(),
            "find_user_by_username",
            &sql,
            &[SqlValue::from(username)],
            user_from_row,
        )
        .await
    }

    async fn list(&self) -> Result<Vec<User>, PersistenceError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id");
        fetch_all(self.executor.as_ref(), "list_users", &sql, &[], user_from_row).await
    }

    async fn insert(&self, user: &NewUser) -> Result<User, PersistenceError> {
        let sql = format!(
            "INSERT INTO users (username, password, display_name, environment) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        let params = [
            SqlValue::from(user.username.as_str()),
            SqlValue::from(user.password.as_str()),
            nullable(user.display_name.clone(), SqlType::Text),
            nullable(user.environment.clone(), SqlType::Text),
        ];
        fetch_one(self.executor.as_ref(), "insert_user", &sql, &params, user_from_row).await
    }

    async fn update(
        &self,
        id: i32,
        changes: &UserUpdate,
    ) -> Result<Option<User>, PersistenceError> {
        let mut assignments = Assignments::default();
        if let Some(password) = &changes.password {
            assignments.set("password", SqlValue::from(password.as_str()));
        }
        if let Some(display_name) = &changes.display_name {
            assignments.set("display_name", nullable(display_name.clone(), SqlType::Text));
        }
        if assignments.is_empty() {
            return self.find_by_id(id).await;
        }

        let (sql, params) = assignments.into_statement("users", id, USER_COLUMNS);
        fetch_optional(self.executor.as_ref(), "update_user", &sql, &params, user_from_row).await
    }
}
