//! Outbound adapters implementing the domain storage ports.
//!
//! - **persistence**: Diesel-mapped PostgreSQL repositories (first tier).
//! - **raw_sql**: hand-written sqlx statements (connection fallback tier).
//! - **memory**: volatile emergency store (production outage tier).
//!
//! Adapters translate between domain types and infrastructure
//! representations. Fallback policy lives in the gateway, not here.

pub mod memory;
pub mod persistence;
pub mod raw_sql;
