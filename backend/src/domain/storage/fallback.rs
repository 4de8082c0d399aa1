//! Fallback chain across storage tiers.

use std::future::Future;

use tracing::{debug, warn};

use crate::domain::ports::{ErrorClass, PersistenceError};

/// Run `call` against each tier in order until one answers.
///
/// Only connection-class failures advance to the next tier. Conflicts and
/// data errors return immediately, since another tier would reject the
/// same statement for the same reason.
pub(super) async fn run_tiers<R, T, F, Fut>(
    operation: &'static str,
    tiers: Vec<(&'static str, R)>,
    call: F,
) -> Result<T, PersistenceError>
where
    F: Fn(R) -> Fut,
    Fut: Future<Output = Result<T, PersistenceError>>,
{
    let mut last_error = None;
    for (tier, port) in tiers {
        match call(port).await {
            Ok(value) => {
                if last_error.is_some() {
                    debug!(operation, tier, "fallback tier answered");
                }
                return Ok(value);
            }
            Err(error) if error.class() == ErrorClass::ConnectionFailure => {
                warn!(operation, tier, %error, "tier unreachable; trying next tier");
                last_error = Some(error);
            }
            Err(error) => {
                debug!(operation, tier, %error, "tier rejected operation");
                return Err(error);
            }
        }
    }
    Err(last_error
        .unwrap_or_else(|| PersistenceError::connection("no storage tier configured")))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use rstest::rstest;

    fn outcome(error: Option<PersistenceError>) -> Result<&'static str, PersistenceError> {
        error.map_or(Ok("answered"), Err)
    }

    #[rstest]
    #[tokio::test]
    async fn connection_failure_advances_to_next_tier() {
        let calls = AtomicUsize::new(0);
        let result = run_tiers(
            "probe",
            vec![
                ("orm", Some(PersistenceError::connection("refused"))),
                ("raw_sql", None),
            ],
            |failure| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { outcome(failure) }
            },
        )
        .await;

        assert_eq!(result, Ok("answered"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[rstest]
    #[case(PersistenceError::unique_violation("users_username_key"))]
    #[case(PersistenceError::query("column does not exist"))]
    #[tokio::test]
    async fn non_connection_failures_stop_the_chain(#[case] error: PersistenceError) {
        let calls = AtomicUsize::new(0);
        let result = run_tiers(
            "probe",
            vec![("orm", Some(error.clone())), ("raw_sql", None)],
            |failure| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move { outcome(failure) }
            },
        )
        .await;

        assert_eq!(result, Err(error));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn exhausted_chain_returns_last_connection_error() {
        let result = run_tiers(
            "probe",
            vec![
                ("orm", Some(PersistenceError::connection("refused"))),
                ("raw_sql", Some(PersistenceError::connection("reset"))),
            ],
            |failure| async move { outcome(failure) },
        )
        .await;

        assert_eq!(result, Err(PersistenceError::connection("reset")));
    }

    #[rstest]
    #[tokio::test]
    async fn empty_chain_reports_connection_failure() {
        let result = run_tiers("probe", Vec::<(&str, Option<PersistenceError>)>::new(), |failure| {
            async move { outcome(failure) }
        })
        .await;

        assert!(result.is_err_and(|error| error.is_connection()));
    }
}
