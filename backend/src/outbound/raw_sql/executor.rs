//! Raw SQL execution through sqlx, independent of the Diesel mapping.
//!
//! Each call is a single autocommit statement with no retries. Failures are
//! normalised into [`PersistenceError`] so the gateway classifies them the
//! same way as ORM failures.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Column, Row, TypeInfo};
use tracing::debug;

use crate::domain::ports::{ConnectionProbe, PersistenceError, constraint_name_from_message};
use crate::outbound::persistence::PoolConfig;

use super::value::{SqlRow, SqlType, SqlValue};

/// A raw statement failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{operation}: {cause}")]
pub struct QueryFailed {
    pub operation: &'static str,
    #[source]
    pub cause: PersistenceError,
}

impl From<QueryFailed> for PersistenceError {
    fn from(value: QueryFailed) -> Self {
        value.cause
    }
}

/// Executes parameterised SQL and returns decoded rows.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RawSqlExecutor: Send + Sync {
    /// Run `sql` with positional `$n` parameters.
    ///
    /// `operation` labels the statement in logs and errors.
    async fn execute(
        &self,
        operation: &'static str,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<SqlRow>, QueryFailed>;
}

/// `RawSqlExecutor` over a sqlx `PgPool`.
#[derive(Clone)]
pub struct SqlxRawExecutor {
    pool: PgPool,
}

impl SqlxRawExecutor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Build a lazily connecting pool sized like the Diesel pool.
    ///
    /// # Errors
    ///
    /// Returns a query error when the database URL cannot be parsed.
    pub fn connect_lazy(config: &PoolConfig) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_size())
            .acquire_timeout(config.connection_timeout())
            .connect_lazy(config.database_url())
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl RawSqlExecutor for SqlxRawExecutor {
    async fn execute(
        &self,
        operation: &'static str,
        sql: &str,
        params: &[SqlValue],
    ) -> Result<Vec<SqlRow>, QueryFailed> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = match param {
                SqlValue::Bool(value) => query.bind(*value),
                SqlValue::Int(value) => query.bind(*value),
                SqlValue::BigInt(value) => query.bind(*value),
                SqlValue::Float(value) => query.bind(*value),
                SqlValue::Text(value) => query.bind(value.clone()),
                SqlValue::TextArray(value) => query.bind(value.clone()),
                SqlValue::Timestamp(value) => query.bind(*value),
                SqlValue::Null(SqlType::Bool) => query.bind(None::<bool>),
                SqlValue::Null(SqlType::Int) => query.bind(None::<i32>),
                SqlValue::Null(SqlType::BigInt) => query.bind(None::<i64>),
                SqlValue::Null(SqlType::Float) => query.bind(None::<f64>),
                SqlValue::Null(SqlType::Text) => query.bind(None::<String>),
                SqlValue::Null(SqlType::TextArray) => query.bind(None::<Vec<String>>),
                SqlValue::Null(SqlType::Timestamp) => {
                    query.bind(None::<chrono::DateTime<chrono::Utc>>)
                }
            };
        }

        let failed = |cause: PersistenceError| {
            debug!(operation, error = %cause, "raw statement failed");
            QueryFailed { operation, cause }
        };

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|error| failed(map_sqlx_error(error)))?;
        debug!(operation, rows = rows.len(), "raw statement executed");

        rows.iter()
            .map(decode_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(failed)
    }
}

fn decode_row(row: &PgRow) -> Result<SqlRow, PersistenceError> {
    let mut columns = Vec::with_capacity(row.len());
    for column in row.columns() {
        let index = column.ordinal();
        let type_name = column.type_info().name();
        let value = match type_name {
            "BOOL" => decode(row, index, SqlValue::Bool, SqlType::Bool)?,
            "INT4" => decode(row, index, SqlValue::Int, SqlType::Int)?,
            "INT8" => decode(row, index, SqlValue::BigInt, SqlType::BigInt)?,
            "FLOAT8" => decode(row, index, SqlValue::Float, SqlType::Float)?,
            "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
                decode(row, index, SqlValue::Text, SqlType::Text)?
            }
            "TEXT[]" | "VARCHAR[]" => decode(row, index, SqlValue::TextArray, SqlType::TextArray)?,
            "TIMESTAMPTZ" => decode(row, index, SqlValue::Timestamp, SqlType::Timestamp)?,
            other => {
                return Err(PersistenceError::query(format!(
                    "column {} has unsupported type {other}",
                    column.name()
                )));
            }
        };
        columns.push((column.name().to_owned(), value));
    }
    Ok(SqlRow::new(columns))
}

fn decode<T>(
    row: &PgRow,
    index: usize,
    wrap: fn(T) -> SqlValue,
    kind: SqlType,
) -> Result<SqlValue, PersistenceError>
where
    T: for<'r> sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get::<Option<T>, _>(index)
        .map(|value| value.map_or(SqlValue::Null(kind), wrap))
        .map_err(map_sqlx_error)
}

/// Normalise a sqlx error into the shared persistence error.
pub(crate) fn map_sqlx_error(error: sqlx::Error) -> PersistenceError {
    match error {
        sqlx::Error::Io(source) => PersistenceError::connection(source.to_string()),
        sqlx::Error::Tls(source) => PersistenceError::connection(source.to_string()),
        sqlx::Error::PoolTimedOut => {
            PersistenceError::connection("timed out waiting for a pooled connection")
        }
        sqlx::Error::PoolClosed => PersistenceError::connection("pool closed"),
        sqlx::Error::WorkerCrashed => PersistenceError::connection("connection worker crashed"),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            let constraint = db
                .constraint()
                .or_else(|| constraint_name_from_message(db.message()))
                .unwrap_or("unknown");
            PersistenceError::unique_violation(constraint)
        }
        sqlx::Error::Database(db) => PersistenceError::from_driver_message(db.message()),
        other => PersistenceError::from_driver_message(other.to_string()),
    }
}

/// Health probe issuing `SELECT 1` through a raw executor.
#[derive(Clone)]
pub struct RawConnectionProbe {
    executor: Arc<dyn RawSqlExecutor>,
}

impl RawConnectionProbe {
    pub fn new(executor: Arc<dyn RawSqlExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl ConnectionProbe for RawConnectionProbe {
    async fn ping(&self) -> Result<(), PersistenceError> {
        self.executor
            .execute("health_check", "SELECT 1", &[])
            .await
            .map(|_| ())
            .map_err(PersistenceError::from)
    }
}
