//! Quorum release algorithm implementation.

use std::sync::Arc;
use std::time::Duration;

use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::token::Token;

use super::dispatch::{CallBounds, StoreOp, fan_out};
use super::helper::QuorumHelper;

/// What happened to one store during release.
#[derive(Debug)]
pub enum ReleaseOutcome {
    /// The store held our token and removed it.
    Released,
    /// The store did not hold our token (never acquired there, expired,
    /// or taken over by another holder). Nothing was removed.
    NotHeld,
    /// The store could not be reached or errored.
    Failed(LockError),
}

/// Per-store results of a quorum release, indexed by store position.
#[derive(Debug)]
pub struct ReleaseReport {
    outcomes: Vec<ReleaseOutcome>,
}

impl ReleaseReport {
    pub fn outcomes(&self) -> &[ReleaseOutcome] {
        &self.outcomes
    }

    pub fn released_count(&self) -> usize {
        self.count(|o| matches!(o, ReleaseOutcome::Released))
    }

    pub fn not_held_count(&self) -> usize {
        self.count(|o| matches!(o, ReleaseOutcome::NotHeld))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ReleaseOutcome::Failed(_)))
    }

    /// Returns `true` if every store either released or did not hold the token.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }

    /// Collapses the report into the result of `LockHandle::release`.
    ///
    /// Only failures numerous enough that a majority may still hold the
    /// entry are fatal; `NotHeld` never is.
    pub fn into_result(self) -> LockResult<()> {
        let failed = self.failed_count();
        let total = self.outcomes.len();
        if QuorumHelper::has_too_many_failures_or_faults(failed, total) {
            Err(LockError::Release { failed, total })
        } else {
            Ok(())
        }
    }

    fn count(&self, predicate: impl Fn(&ReleaseOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }
}

/// Releases `key` on every store with compare-and-delete against `token`.
///
/// All stores are tried, not only the ones that accepted the token: a
/// write that looked failed may still have landed.
pub async fn release_quorum<S: StoreAdapter>(
    key: &Arc<str>,
    stores: &Arc<Vec<S>>,
    token: &Token,
    adapter_timeout: Duration,
) -> ReleaseReport {
    let results = fan_out(
        stores,
        key,
        StoreOp::CompareAndDelete {
            token: token.clone(),
        },
        CallBounds::awaited(adapter_timeout),
    )
    .await;

    let outcomes = results
        .into_iter()
        .map(|result| match result {
            Ok(true) => ReleaseOutcome::Released,
            Ok(false) => ReleaseOutcome::NotHeld,
            Err(error) => ReleaseOutcome::Failed(error),
        })
        .collect();

    ReleaseReport { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<ReleaseOutcome>) -> ReleaseReport {
        ReleaseReport { outcomes }
    }

    fn failed() -> ReleaseOutcome {
        ReleaseOutcome::Failed(LockError::adapter("unreachable"))
    }

    #[test]
    fn test_single_failure_is_not_fatal() {
        let report = report(vec![
            ReleaseOutcome::Released,
            ReleaseOutcome::Released,
            failed(),
        ]);
        assert!(!report.is_clean());
        assert_eq!(report.failed_count(), 1);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_not_held_is_never_fatal() {
        let report = report(vec![
            ReleaseOutcome::NotHeld,
            ReleaseOutcome::NotHeld,
            ReleaseOutcome::NotHeld,
        ]);
        assert!(report.is_clean());
        assert_eq!(report.not_held_count(), 3);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn test_majority_failure_is_a_release_error() {
        let report = report(vec![ReleaseOutcome::Released, failed(), failed()]);
        match report.into_result() {
            Err(LockError::Release { failed, total }) => {
                assert_eq!(failed, 2);
                assert_eq!(total, 3);
            }
            other => panic!("expected release error, got {other:?}"),
        }
    }
}
