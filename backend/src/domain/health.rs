//! Connection health monitor for the relational backend.
//!
//! The monitor collapses concurrent checks into a single in-flight probe:
//! callers arriving while a probe runs are told `false` straight away rather
//! than queueing behind it. Degraded mode is advisory; the gateway still
//! attempts relational operations while it is set.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use tracing::{debug, info, warn};

use super::ports::ConnectionProbe;

/// Tracks backend reachability across the process.
pub struct ConnectionHealthMonitor {
    probe: Arc<dyn ConnectionProbe>,
    in_progress: AtomicBool,
    consecutive_failures: AtomicU32,
    degraded: AtomicBool,
}

/// Releases the in-flight flag even if the checking future is dropped.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ConnectionHealthMonitor {
    /// Create a monitor that starts healthy.
    pub fn new(probe: Arc<dyn ConnectionProbe>) -> Self {
        Self {
            probe,
            in_progress: AtomicBool::new(false),
            consecutive_failures: AtomicU32::new(0),
            degraded: AtomicBool::new(false),
        }
    }

    /// Probe the backend once.
    ///
    /// Returns `false` without probing when another check is in flight.
    pub async fn check_connection(&self) -> bool {
        if self
            .in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("connection check already in progress");
            return false;
        }
        let _in_flight = InFlight(&self.in_progress);

        match self.probe.ping().await {
            Ok(()) => {
                self.consecutive_failures.store(0, Ordering::Release);
                if self.degraded.swap(false, Ordering::AcqRel) {
                    info!("storage backend reachable again; leaving degraded mode");
                }
                true
            }
            Err(error) => {
                let failures = self
                    .consecutive_failures
                    .fetch_add(1, Ordering::AcqRel)
                    .saturating_add(1);
                if !self.degraded.swap(true, Ordering::AcqRel) {
                    warn!(%error, failures, "storage backend unreachable; entering degraded mode");
                } else {
                    debug!(%error, failures, "storage backend still unreachable");
                }
                false
            }
        }
    }

    /// Whether the last completed check failed.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Failed checks since the last success.
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }
}
