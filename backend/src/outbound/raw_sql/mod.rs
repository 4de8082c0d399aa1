//! Raw SQL tier.
//!
//! Implements the same repository ports as the Diesel adapters with
//! hand-written statements, explicit column lists, and `RETURNING`. The
//! gateway falls back here when the ORM-mapped tier reports a
//! connection-class failure.

mod executor;
mod movies;
mod platforms;
mod users;
mod value;
mod watchlist;

use std::sync::Arc;

pub use executor::{QueryFailed, RawConnectionProbe, RawSqlExecutor, SqlxRawExecutor};
#[cfg(test)]
pub use executor::MockRawSqlExecutor;
pub use movies::RawMovieRepository;
pub use platforms::RawPlatformRepository;
pub use users::RawUserRepository;
pub use value::{SqlRow, SqlType, SqlValue, nullable};
pub use watchlist::RawWatchlistRepository;

use crate::domain::StorageTier;
use crate::domain::ports::PersistenceError;
use crate::domain::storage::RAW_SQL_TIER;

/// Assemble the raw SQL tier over one executor.
pub fn raw_sql_tier(executor: Arc<dyn RawSqlExecutor>) -> StorageTier {
    StorageTier::new(
        RAW_SQL_TIER,
        Arc::new(RawUserRepository::new(executor.clone())),
        Arc::new(RawMovieRepository::new(executor.clone())),
        Arc::new(RawPlatformRepository::new(executor.clone())),
        Arc::new(RawWatchlistRepository::new(executor)),
    )
}

/// Run a statement expected to yield at most one row.
async fn fetch_optional<T>(
    executor: &dyn RawSqlExecutor,
    operation: &'static str,
    sql: &str,
    params: &[SqlValue],
    decode: fn(&SqlRow) -> Result<T, PersistenceError>,
) -> Result<Option<T>, PersistenceError> {
    let rows = executor.execute(operation, sql, params).await?;
    rows.first().map(decode).transpose()
}

/// Run a statement that must yield exactly one row, as `INSERT .. RETURNING`.
async fn fetch_one<T>(
    executor: &dyn RawSqlExecutor,
    operation: &'static str,
    sql: &str,
    params: &[SqlValue],
    decode: fn(&SqlRow) -> Result<T, PersistenceError>,
) -> Result<T, PersistenceError> {
    fetch_optional(executor, operation, sql, params, decode)
        .await?
        .ok_or_else(|| PersistenceError::query(format!("{operation} returned no rows")))
}

async fn fetch_all<T>(
    executor: &dyn RawSqlExecutor,
    operation: &'static str,
    sql: &str,
    params: &[SqlValue],
    decode: fn(&SqlRow) -> Result<T, PersistenceError>,
) -> Result<Vec<T>, PersistenceError> {
    let rows = executor.execute(operation, sql, params).await?;
    rows.iter().map(decode).collect()
}

/// `DELETE .. RETURNING id`; true when a row went away.
async fn delete_by_id(
    executor: &dyn RawSqlExecutor,
    operation: &'static str,
    table: &str,
    id: i32,
) -> Result<bool, PersistenceError> {
    let sql = format!("DELETE FROM {table} WHERE id = $1 RETURNING id");
    let rows = executor.execute(operation, &sql, &[SqlValue::Int(id)]).await?;
    Ok(!rows.is_empty())
}

/// Builder for `UPDATE .. SET` with only the supplied columns.
#[derive(Debug, Default)]
struct Assignments {
    columns: Vec<&'static str>,
    params: Vec<SqlValue>,
}

impl Assignments {
    fn set(&mut self, column: &'static str, value: SqlValue) {
        self.columns.push(column);
        self.params.push(value);
    }

    fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Render `UPDATE table SET .. WHERE id = $n RETURNING returning`.
    fn into_statement(self, table: &str, id: i32, returning: &str) -> (String, Vec<SqlValue>) {
        let set = self
            .columns
            .iter()
            .enumerate()
            .map(|(index, column)| format!("{column} = ${}", index + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let mut params = self.params;
        params.push(SqlValue::Int(id));
        let sql = format!(
            "UPDATE {table} SET {set} WHERE id = ${} RETURNING {returning}",
            params.len()
        );
        (sql, params)
    }
}
