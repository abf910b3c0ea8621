//! Quorum acquire algorithm implementation.

use std::sync::Arc;
use std::time::{Duration, Instant};

use keyed_mutex_core::clock::Clock;
use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::timeout::{Backoff, Deadline};
use keyed_mutex_core::token::Token;
use tracing::debug;

use super::dispatch::{CallBounds, StoreOp, fan_out};
use super::helper::QuorumHelper;
use super::timeouts::validity_window;
use crate::options::StoreLockOptions;

/// A successful quorum acquisition.
#[derive(Debug)]
pub struct QuorumAcquisition {
    /// Token written during the winning round.
    pub token: Token,
    /// Per-store results of the winning round, indexed by store position.
    pub acquired: Vec<bool>,
    /// Validity window computed when the round completed.
    pub validity: Duration,
    /// Instant after which the lock can no longer be assumed held.
    pub valid_until: Instant,
    /// Rounds it took, including the winning one.
    pub rounds: u32,
}

impl QuorumAcquisition {
    /// Returns the number of stores that accepted the token.
    pub fn success_count(&self) -> usize {
        self.acquired.iter().filter(|&&v| v).count()
    }
}

/// Acquires `key` on a majority of `stores`, retrying rounds until the
/// acquire timeout in `options` is spent.
///
/// Store errors count as non-successes for the round, never as fatal.
///
/// Each round's writes are bounded by the adapter timeout, capped to the
/// remaining budget. Cleanup after a failed round waits at most for the
/// remaining budget; slower deletes finish in the background.
///
/// # Errors
///
/// Returns `LockError::Timeout` once the budget is exhausted. A zero
/// budget still runs exactly one round.
pub async fn acquire_quorum<S, C>(
    key: &Arc<str>,
    stores: &Arc<Vec<S>>,
    options: &StoreLockOptions,
    clock: &C,
) -> LockResult<QuorumAcquisition>
where
    S: StoreAdapter,
    C: Clock,
{
    let store_count = stores.len();
    let lease = options.lease();
    let deadline = Deadline::start(clock.now(), options.acquire_timeout());
    let backoff = Backoff::new(options.retry_interval());
    let mut rounds = 0u32;

    loop {
        if rounds > 0 && deadline.is_expired(clock.now()) {
            return Err(LockError::Timeout(deadline.budget()));
        }
        rounds += 1;
        let token = Token::generate();
        let round_start = clock.now();
        let bound = deadline.attempt_bound(round_start, options.adapter_timeout());

        let results = fan_out(
            stores,
            key,
            StoreOp::PutIfAbsent {
                token: token.clone(),
                ttl: lease,
            },
            CallBounds::awaited(bound),
        )
        .await;

        let round_end = clock.now();
        let elapsed = round_end.saturating_duration_since(round_start);

        for (idx, result) in results.iter().enumerate() {
            if let Err(error) = result {
                debug!(round = rounds, store = idx, %error, "store failed during acquire");
            }
        }
        let acquired: Vec<bool> = results.iter().map(|r| matches!(r, Ok(true))).collect();
        let success_count = acquired.iter().filter(|&&v| v).count();
        let validity = validity_window(lease, elapsed, options.drift_margin());

        if QuorumHelper::has_sufficient_successes(success_count, store_count)
            && let Some(validity) = validity
        {
            return Ok(QuorumAcquisition {
                token,
                acquired,
                validity,
                valid_until: round_end + validity,
                rounds,
            });
        }

        debug!(
            round = rounds,
            successes = success_count,
            quorum = QuorumHelper::threshold(store_count),
            elapsed_ms = elapsed.as_millis() as u64,
            validity = ?validity,
            "quorum round failed"
        );

        // Remove whatever this round did manage to write.
        let cleanup_bounds = CallBounds {
            call_timeout: options.adapter_timeout(),
            wait: options.adapter_timeout().min(deadline.remaining(clock.now())),
        };
        let cleanup =
            fan_out(stores, key, StoreOp::CompareAndDelete { token }, cleanup_bounds).await;
        for (idx, result) in cleanup.iter().enumerate() {
            if let Err(error) = result {
                debug!(round = rounds, store = idx, %error, "cleanup failed; entry will expire");
            }
        }

        let now = clock.now();
        if !deadline.is_expired(now) {
            clock.sleep(backoff.next_delay(deadline.remaining(now))).await;
        }
    }
}
