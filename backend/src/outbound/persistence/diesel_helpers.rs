//! Error mapping shared by the Diesel repositories.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::{PersistenceError, constraint_name_from_message};

use super::pool::PoolError;

/// Pool failures mean the backend could not be reached.
pub(crate) fn map_pool_error(error: PoolError) -> PersistenceError {
    PersistenceError::connection(error.into_message())
}

/// Map a Diesel error onto the shared persistence error.
///
/// Unique violations keep their constraint name; other database errors are
/// classified from the driver message so a dropped connection reported as
/// `Unknown` still counts as connection-class.
pub(crate) fn map_diesel_error(error: DieselError) -> PersistenceError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
            let constraint = info
                .constraint_name()
                .or_else(|| constraint_name_from_message(info.message()))
                .unwrap_or("unknown");
            PersistenceError::unique_violation(constraint)
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, info) => {
            PersistenceError::connection(info.message())
        }
        DieselError::DatabaseError(_, info) => PersistenceError::from_driver_message(info.message()),
        DieselError::NotFound => PersistenceError::query("record not found"),
        DieselError::QueryBuilderError(source) => PersistenceError::query(source.to_string()),
        other => PersistenceError::from_driver_message(other.to_string()),
    }
}
