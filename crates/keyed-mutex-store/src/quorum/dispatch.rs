//! Concurrent fan-out of one store operation to every store.

use std::sync::Arc;
use std::time::Duration;

use keyed_mutex_core::error::{LockError, LockResult};
use keyed_mutex_core::store::StoreAdapter;
use keyed_mutex_core::token::Token;
use tokio::task::JoinSet;
use tracing::debug;

/// Operation applied to each store in a quorum.
#[derive(Debug, Clone)]
pub enum StoreOp {
    PutIfAbsent { token: Token, ttl: Duration },
    CompareAndDelete { token: Token },
}

/// How long store calls may run, and how long the caller waits for them.
#[derive(Debug, Clone, Copy)]
pub struct CallBounds {
    /// Hard limit on each call.
    pub call_timeout: Duration,
    /// How long the caller waits for each call. Calls still running after
    /// this carry on in the background until `call_timeout`.
    pub wait: Duration,
}

impl CallBounds {
    /// The caller waits as long as each call may run.
    pub fn awaited(call_timeout: Duration) -> Self {
        Self {
            call_timeout,
            wait: call_timeout,
        }
    }
}

async fn apply<S: StoreAdapter>(
    stores: Arc<Vec<S>>,
    idx: usize,
    key: Arc<str>,
    op: StoreOp,
) -> LockResult<bool> {
    let store = &stores[idx];
    match op {
        StoreOp::PutIfAbsent { token, ttl } => store.put_if_absent(&key, &token, ttl).await,
        StoreOp::CompareAndDelete { token } => store.compare_and_delete(&key, &token).await,
    }
}

/// Runs `op` against every store concurrently, one task per store.
///
/// Results are indexed by store position. A call that outlives
/// `bounds.wait`, or a task that panics, yields `LockError::Adapter`.
pub async fn fan_out<S: StoreAdapter>(
    stores: &Arc<Vec<S>>,
    key: &Arc<str>,
    op: StoreOp,
    bounds: CallBounds,
) -> Vec<LockResult<bool>> {
    let mut tasks = JoinSet::new();

    for idx in 0..stores.len() {
        let call = Box::pin(apply(Arc::clone(stores), idx, Arc::clone(key), op.clone()));
        tasks.spawn(async move { (idx, bounded_call(call, bounds).await) });
    }

    let mut results: Vec<LockResult<bool>> = (0..stores.len())
        .map(|_| Err(LockError::adapter("store task did not complete")))
        .collect();

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, result)) => results[idx] = result,
            Err(error) => debug!(%error, "store task failed"),
        }
    }

    results
}

async fn bounded_call<F>(mut call: std::pin::Pin<Box<F>>, bounds: CallBounds) -> LockResult<bool>
where
    F: Future<Output = LockResult<bool>> + Send + 'static,
{
    let wait = bounds.wait.min(bounds.call_timeout);
    if let Ok(result) = tokio::time::timeout(wait, call.as_mut()).await {
        return result;
    }

    let rest = bounds.call_timeout - wait;
    if rest.is_zero() {
        return Err(LockError::adapter(format!(
            "store call timed out after {:?}",
            bounds.call_timeout
        )));
    }

    tokio::spawn(async move {
        if tokio::time::timeout(rest, call).await.is_err() {
            debug!("background store call timed out");
        }
    });
    Err(LockError::adapter(format!(
        "store call still running after {wait:?}; left to finish in the background"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::pending;

    #[tokio::test(start_paused = true)]
    async fn test_call_exceeding_timeout_is_an_adapter_error() {
        let start = tokio::time::Instant::now();
        let call = Box::pin(pending::<LockResult<bool>>());

        let result = bounded_call(call, CallBounds::awaited(Duration::from_millis(200))).await;

        assert!(matches!(result, Err(LockError::Adapter(_))));
        assert_eq!(start.elapsed(), Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_wait_still_completes_ready_calls() {
        let call = Box::pin(async { Ok(true) });
        let bounds = CallBounds {
            call_timeout: Duration::from_secs(3),
            wait: Duration::ZERO,
        };

        assert!(bounded_call(call, bounds).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_wait_returns_before_call_timeout() {
        let start = tokio::time::Instant::now();
        let call = Box::pin(pending::<LockResult<bool>>());
        let bounds = CallBounds {
            call_timeout: Duration::from_secs(3),
            wait: Duration::from_millis(50),
        };

        assert!(bounded_call(call, bounds).await.is_err());
        assert_eq!(start.elapsed(), Duration::from_millis(50));
    }
}
