//! Storage configuration loaded via OrthoConfig.
//!
//! Values come from CLI flags, `WATCHLIST_*` environment variables, or a
//! configuration file, in OrthoConfig's usual precedence.

use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{DeploymentEnvironment, ParseEnvironmentError};
use crate::outbound::persistence::PoolConfig;

const DEFAULT_POOL_MAX_SIZE: u32 = 10;
const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Settings for the relational pools and the fallback tiers.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WATCHLIST")]
pub struct StorageSettings {
    /// PostgreSQL connection URL shared by the Diesel and raw SQL tiers.
    pub database_url: Option<String>,
    /// Deployment environment: `production`, `development`, or `test`.
    pub environment: Option<String>,
    /// Enable the emergency in-memory tier. Only honoured in production.
    #[ortho_config(default = false)]
    pub emergency_store: bool,
    /// Maximum pooled connections per tier.
    pub pool_max_size: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub connection_timeout_secs: Option<u64>,
}

impl StorageSettings {
    /// Configured environment, defaulting to development.
    pub fn environment(&self) -> Result<DeploymentEnvironment, ParseEnvironmentError> {
        self.environment
            .as_deref()
            .map_or(Ok(DeploymentEnvironment::default()), str::parse)
    }

    pub fn pool_max_size(&self) -> u32 {
        self.pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(
            self.connection_timeout_secs
                .unwrap_or(DEFAULT_CONNECTION_TIMEOUT_SECS),
        )
    }

    /// Pool configuration, or `None` when no database URL is set.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        self.database_url.as_deref().map(|url| {
            PoolConfig::new(url)
                .with_max_size(self.pool_max_size())
                .with_connection_timeout(self.connection_timeout())
        })
    }
}
