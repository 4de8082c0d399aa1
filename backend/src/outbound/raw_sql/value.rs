//! Parameter and column values for the raw SQL tier.

use chrono::{DateTime, Utc};

use crate::domain::ports::PersistenceError;

/// Column type of a typed `NULL` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Bool,
    Int,
    BigInt,
    Float,
    Text,
    TextArray,
    Timestamp,
}

/// A bound parameter or decoded column.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Bool(bool),
    Int(i32),
    BigInt(i64),
    Float(f64),
    Text(String),
    TextArray(Vec<String>),
    Timestamp(DateTime<Utc>),
    /// `NULL` carrying its column type so PostgreSQL can infer the parameter.
    Null(SqlType),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null(_))
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int4",
            Self::BigInt(_) => "int8",
            Self::Float(_) => "float8",
            Self::Text(_) => "text",
            Self::TextArray(_) => "text[]",
            Self::Timestamp(_) => "timestamptz",
            Self::Null(_) => "null",
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<String>> for SqlValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextArray(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Bind an optional value, falling back to a typed `NULL`.
pub fn nullable<T: Into<SqlValue>>(value: Option<T>, kind: SqlType) -> SqlValue {
    value.map_or(SqlValue::Null(kind), Into::into)
}

/// One result row as ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlRow {
    columns: Vec<(String, SqlValue)>,
}

macro_rules! accessors {
    ($(($required:ident, $optional:ident, $variant:ident, $ty:ty)),* $(,)?) => {
        $(
            pub fn $required(&self, column: &str) -> Result<$ty, PersistenceError> {
                self.$optional(column)?
                    .ok_or_else(|| PersistenceError::query(format!("column {column} is null")))
            }

            pub fn $optional(&self, column: &str) -> Result<Option<$ty>, PersistenceError> {
                match self.value(column)? {
                    SqlValue::$variant(value) => Ok(Some(value.clone())),
                    SqlValue::Null(_) => Ok(None),
                    other => Err(mismatch(column, stringify!($variant), other)),
                }
            }
        )*
    };
}

impl SqlRow {
    pub fn new(columns: Vec<(String, SqlValue)>) -> Self {
        Self { columns }
    }

    /// Append a column. Used by executors and test doubles.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.columns.push((column.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Raw value of a column.
    pub fn value(&self, column: &str) -> Result<&SqlValue, PersistenceError> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
            .ok_or_else(|| PersistenceError::query(format!("missing column {column}")))
    }

    accessors!(
        (bool, opt_bool, Bool, bool),
        (int, opt_int, Int, i32),
        (big_int, opt_big_int, BigInt, i64),
        (float, opt_float, Float, f64),
        (text, opt_text, Text, String),
        (text_array, opt_text_array, TextArray, Vec<String>),
        (timestamp, opt_timestamp, Timestamp, DateTime<Utc>),
    );
}

fn mismatch(column: &str, expected: &str, found: &SqlValue) -> PersistenceError {
    PersistenceError::query(format!(
        "column {column}: expected {expected}, found {}",
        found.kind()
    ))
}
