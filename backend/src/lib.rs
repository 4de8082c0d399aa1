//! Tiered, fault-tolerant storage for a movie and TV watchlist.
//!
//! Callers talk to [`domain::StorageGateway`]. Behind it sit three tiers:
//! Diesel-mapped PostgreSQL ([`outbound::persistence`]), raw sqlx
//! statements ([`outbound::raw_sql`]), and a volatile emergency store
//! ([`outbound::memory`]).

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use config::StorageSettings;
