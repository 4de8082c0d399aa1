//! PostgreSQL persistence adapters using Diesel.
//!
//! This is the ORM-mapped tier: the first tier every gateway operation
//! tries. Repositories are thin translators between Diesel row structs
//! (`models.rs`) and domain entities; neither the rows nor the schema leave
//! this module.
//!
//! # Example
//!
//! ```ignore
//! use watchlist::outbound::persistence::{DbPool, PoolConfig, diesel_tier};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/watchlist")).await?;
//! let orm = diesel_tier(pool);
//! ```

pub(crate) mod diesel_helpers;
mod diesel_movie_repository;
mod diesel_platform_repository;
mod diesel_user_repository;
mod diesel_watchlist_repository;
mod models;
mod pool;
mod schema;

use std::sync::Arc;

pub use diesel_movie_repository::DieselMovieRepository;
pub use diesel_platform_repository::DieselPlatformRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use diesel_watchlist_repository::DieselWatchlistRepository;
pub use pool::{DbPool, PoolConfig, PoolError};

use crate::domain::StorageTier;
use crate::domain::storage::ORM_TIER;

/// Assemble the ORM-mapped tier over one pool.
pub fn diesel_tier(pool: DbPool) -> StorageTier {
    StorageTier::new(
        ORM_TIER,
        Arc::new(DieselUserRepository::new(pool.clone())),
        Arc::new(DieselMovieRepository::new(pool.clone())),
        Arc::new(DieselPlatformRepository::new(pool.clone())),
        Arc::new(DieselWatchlistRepository::new(pool)),
    )
}
