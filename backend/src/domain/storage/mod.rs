//! Tiered, fault-tolerant storage gateway.
//!
//! The gateway is the single storage contract callers see. Each operation
//! runs against the Diesel-mapped tier first and falls back to the raw SQL
//! tier when the failure is connection-class. User creation in production
//! may additionally land in the emergency in-memory tier when the health
//! monitor reports the backend unreachable.
//!
//! Reads never surface infrastructure errors: they degrade to `None`, an
//! empty list, or `false`. Writes return [`StorageError`] once every
//! eligible tier is exhausted.

mod fallback;
mod movies;
mod platforms;
mod users;
mod watchlist;

use std::sync::Arc;

use tracing::warn;

use super::health::ConnectionHealthMonitor;
use super::ports::{
    MovieRepository, PersistenceError, PlatformRepository, UserRepository, WatchlistRepository,
    define_port_error,
};
use super::DeploymentEnvironment;

define_port_error! {
    /// Failures surfaced by gateway writes.
    pub enum StorageError {
        /// The addressed row does not exist.
        NotFound { entity: String } => "{entity} not found",
        /// Another user already holds this username (case-insensitive).
        DuplicateUsername { username: String } => "username '{username}' is already taken",
        /// A movie with this catalog id exists but could not be fetched.
        DuplicateTmdbId { tmdb_id: i32 } => "movie with TMDB id {tmdb_id} already exists",
        /// Every eligible tier was unreachable.
        ConnectionFailure { message: String } => "storage unavailable: {message}",
        /// A tier rejected the operation for a data-related reason.
        QueryFailed { operation: String, message: String } => "{operation} failed: {message}",
    }
}

impl StorageError {
    /// Translate a tier failure that the caller has not resolved itself.
    pub(crate) fn from_persistence(operation: &'static str, error: PersistenceError) -> Self {
        match error {
            PersistenceError::Connection { message } => Self::connection_failure(message),
            PersistenceError::UniqueViolation { constraint } => {
                Self::query_failed(operation, format!("unique constraint violated: {constraint}"))
            }
            PersistenceError::Query { message } => Self::query_failed(operation, message),
        }
    }
}

pub const ORM_TIER: &str = "orm";
pub const RAW_SQL_TIER: &str = "raw_sql";
pub const EMERGENCY_TIER: &str = "emergency";

/// Username of the account every emergency tier is seeded with.
pub const GUEST_USERNAME: &str = "guest";

/// Whether `id` was handed out by the emergency tier.
///
/// Emergency ids count down from -1; relational serials start at 1.
pub fn is_emergency_id(id: i32) -> bool {
    id < 0
}

/// One storage backend, seen through the four repository ports.
#[derive(Clone)]
pub struct StorageTier {
    name: &'static str,
    pub users: Arc<dyn UserRepository>,
    pub movies: Arc<dyn MovieRepository>,
    pub platforms: Arc<dyn PlatformRepository>,
    pub watchlist: Arc<dyn WatchlistRepository>,
}

impl StorageTier {
    /// Assemble a tier from independent repositories.
    pub fn new(
        name: &'static str,
        users: Arc<dyn UserRepository>,
        movies: Arc<dyn MovieRepository>,
        platforms: Arc<dyn PlatformRepository>,
        watchlist: Arc<dyn WatchlistRepository>,
    ) -> Self {
        Self {
            name,
            users,
            movies,
            platforms,
            watchlist,
        }
    }

    /// Build a tier whose ports are all served by one adapter.
    pub fn uniform<A>(name: &'static str, adapter: Arc<A>) -> Self
    where
        A: UserRepository + MovieRepository + PlatformRepository + WatchlistRepository + 'static,
    {
        Self::new(
            name,
            adapter.clone(),
            adapter.clone(),
            adapter.clone(),
            adapter,
        )
    }

    /// Tier label used in log fields.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Storage contract shared by every request handler.
#[derive(Clone)]
pub struct StorageGateway {
    orm: StorageTier,
    raw: Option<StorageTier>,
    emergency: Option<StorageTier>,
    health: Arc<ConnectionHealthMonitor>,
    environment: DeploymentEnvironment,
}

impl StorageGateway {
    /// Gateway over a single relational tier.
    pub fn new(orm: StorageTier, health: Arc<ConnectionHealthMonitor>) -> Self {
        Self {
            orm,
            raw: None,
            emergency: None,
            health,
            environment: DeploymentEnvironment::default(),
        }
    }

    /// Add the raw SQL tier consulted on connection-class failures.
    pub fn with_raw_fallback(mut self, raw: StorageTier) -> Self {
        self.raw = Some(raw);
        self
    }

    /// Add the emergency tier. It is only used in production.
    pub fn with_emergency_tier(mut self, emergency: StorageTier) -> Self {
        self.emergency = Some(emergency);
        self
    }

    pub fn with_environment(mut self, environment: DeploymentEnvironment) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> DeploymentEnvironment {
        self.environment
    }

    /// Whether user writes may route to the emergency tier.
    pub fn emergency_tier_active(&self) -> bool {
        self.emergency.is_some() && self.environment.is_production()
    }

    /// Run one health probe through the shared monitor.
    pub async fn check_connection(&self) -> bool {
        self.health.check_connection().await
    }

    pub fn is_degraded(&self) -> bool {
        self.health.is_degraded()
    }

    /// Relational tiers in fallback order, projected onto one port.
    fn relational<R>(&self, port: impl Fn(&StorageTier) -> R) -> Vec<(&'static str, R)> {
        std::iter::once(&self.orm)
            .chain(self.raw.as_ref())
            .map(|tier| (tier.name, port(tier)))
            .collect()
    }

    fn active_emergency(&self) -> Option<&StorageTier> {
        self.emergency
            .as_ref()
            .filter(|_| self.environment.is_production())
    }
}

/// Log an operation that degraded instead of failing.
fn degraded_read(operation: &'static str, error: &PersistenceError) {
    warn!(operation, %error, "storage tiers exhausted; returning fallback value");
}

#[cfg(test)]
mod tests;
