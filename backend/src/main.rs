//! `watchlist-storage-check`: probe the storage tiers once and report.
//!
//! Exits non-zero when the relational backend is unreachable.

use std::process::ExitCode;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr, eyre};
use ortho_config::OrthoConfig;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use watchlist::StorageSettings;
use watchlist::domain::{ConnectionHealthMonitor, StorageGateway};
use watchlist::outbound::memory::EmergencyStore;
use watchlist::outbound::persistence::{DbPool, diesel_tier};
use watchlist::outbound::raw_sql::{RawConnectionProbe, SqlxRawExecutor, raw_sql_tier};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = StorageSettings::load().wrap_err("failed to load storage settings")?;
    let gateway = build_gateway(&settings).await?;

    let reachable = gateway.check_connection().await;
    info!(
        environment = %gateway.environment(),
        reachable,
        degraded = gateway.is_degraded(),
        emergency_tier_active = gateway.emergency_tier_active(),
        "storage tier status"
    );

    if reachable {
        Ok(ExitCode::SUCCESS)
    } else {
        error!("storage backend unreachable");
        Ok(ExitCode::FAILURE)
    }
}

async fn build_gateway(settings: &StorageSettings) -> Result<StorageGateway> {
    let environment = settings
        .environment()
        .wrap_err("invalid WATCHLIST_ENVIRONMENT")?;
    let pool_config = settings
        .pool_config()
        .ok_or_else(|| eyre!("WATCHLIST_DATABASE_URL is not set"))?
        .with_min_idle(None);

    let executor = Arc::new(
        SqlxRawExecutor::connect_lazy(&pool_config).wrap_err("failed to configure raw SQL pool")?,
    );
    let pool = DbPool::new(pool_config)
        .await
        .wrap_err("failed to build Diesel pool")?;

    let health = Arc::new(ConnectionHealthMonitor::new(Arc::new(
        RawConnectionProbe::new(executor.clone()),
    )));
    let mut gateway = StorageGateway::new(diesel_tier(pool), health)
        .with_raw_fallback(raw_sql_tier(executor))
        .with_environment(environment);
    if settings.emergency_store {
        gateway = gateway.with_emergency_tier(Arc::new(EmergencyStore::new()).into_tier());
    }
    Ok(gateway)
}
