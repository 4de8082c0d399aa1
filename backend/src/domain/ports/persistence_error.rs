//! Shared persistence error for every storage tier, plus classification.
//!
//! Both relational tiers report failures through [`PersistenceError`]. The
//! gateway never inspects messages itself: it asks for an [`ErrorClass`] and
//! lets the fallback chain decide what happens next.

use std::sync::OnceLock;

use regex::Regex;

use super::define_port_error;

define_port_error! {
    /// Errors raised by relational repository adapters.
    pub enum PersistenceError {
        /// The backend could not be reached or dropped the connection.
        Connection { message: String } => "storage connection failed: {message}",
        /// A uniqueness constraint rejected the write.
        UniqueViolation { constraint: String } =>
            "unique constraint violated: {constraint}",
        /// Query or mutation failed for a data-related reason.
        Query { message: String } => "storage query failed: {message}",
    }
}

/// Closed set of failure categories consumed by the fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Network or connection health problem; another tier may succeed.
    ConnectionFailure,
    /// Uniqueness conflict; resolved by re-fetching or surfaced as a duplicate.
    Conflict,
    /// Any other data-tier failure; never retried.
    Other,
}

const CONNECTION_PATTERNS: &[&str] = &[
    "connection refused",
    "connection reset",
    "connection closed",
    "connection terminated",
    "terminating connection",
    "server closed the connection",
    "could not connect",
    "failed to connect",
    "timed out",
    "timeout",
    "broken pipe",
    "socket",
    "network",
    "econnrefused",
    "econnreset",
    "etimedout",
    "enotfound",
    "no route to host",
    "pool closed",
];

const CONFLICT_PATTERNS: &[&str] = &["duplicate key", "unique constraint", "23505"];

/// Classify a driver error message.
///
/// # Examples
/// ```
/// use watchlist::domain::ports::{classify_message, ErrorClass};
///
/// assert_eq!(
///     classify_message("Connection refused (os error 111)"),
///     ErrorClass::ConnectionFailure
/// );
/// assert_eq!(
///     classify_message("duplicate key value violates unique constraint \"movies_tmdb_id_key\""),
///     ErrorClass::Conflict
/// );
/// assert_eq!(classify_message("syntax error at or near \"FROM\""), ErrorClass::Other);
/// ```
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if CONFLICT_PATTERNS.iter().any(|pattern| lower.contains(pattern)) {
        ErrorClass::Conflict
    } else if CONNECTION_PATTERNS
        .iter()
        .any(|pattern| lower.contains(pattern))
    {
        ErrorClass::ConnectionFailure
    } else {
        ErrorClass::Other
    }
}

static CONSTRAINT_RE: OnceLock<Regex> = OnceLock::new();

fn constraint_regex() -> &'static Regex {
    CONSTRAINT_RE.get_or_init(|| {
        Regex::new(r#"constraint "(?P<name>[^"]+)""#)
            .unwrap_or_else(|error| panic!("constraint regex failed to compile: {error}"))
    })
}

/// Extract the constraint name from a PostgreSQL violation message.
pub fn constraint_name_from_message(message: &str) -> Option<&str> {
    constraint_regex()
        .captures(message)
        .and_then(|captures| captures.name("name"))
        .map(|name| name.as_str())
}

impl PersistenceError {
    /// Decode a raw driver message into the matching variant.
    pub fn from_driver_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match classify_message(&message) {
            ErrorClass::ConnectionFailure => Self::connection(message),
            ErrorClass::Conflict => {
                let constraint = constraint_name_from_message(&message)
                    .unwrap_or("unknown")
                    .to_owned();
                Self::unique_violation(constraint)
            }
            ErrorClass::Other => Self::query(message),
        }
    }

    /// Category consumed by the gateway's fallback chain.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Connection { .. } => ErrorClass::ConnectionFailure,
            Self::UniqueViolation { .. } => ErrorClass::Conflict,
            Self::Query { .. } => ErrorClass::Other,
        }
    }
}
