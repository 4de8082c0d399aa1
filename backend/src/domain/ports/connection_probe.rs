//! Port used by the health monitor to test backend reachability.
use async_trait::async_trait;

use super::PersistenceError;

/// Performs one cheap round trip against the relational backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ConnectionProbe: Send + Sync {
    /// Succeeds when the backend accepted and answered a trivial statement.
    async fn ping(&self) -> Result<(), PersistenceError>;
}
