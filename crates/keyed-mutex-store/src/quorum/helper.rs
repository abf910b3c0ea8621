//! Majority arithmetic for quorum acquisition.

/// Helper functions for quorum thresholds.
pub struct QuorumHelper;

impl QuorumHelper {
    /// Minimum number of stores that must agree: `floor(N/2) + 1`.
    pub fn threshold(store_count: usize) -> usize {
        (store_count / 2) + 1
    }

    /// Checks if we have sufficient successes for majority consensus.
    pub fn has_sufficient_successes(success_count: usize, store_count: usize) -> bool {
        success_count >= Self::threshold(store_count)
    }

    /// Checks if enough stores failed that a majority is out of reach.
    ///
    /// That point is `ceil(N/2)` failures, for odd and even N alike.
    pub fn has_too_many_failures_or_faults(
        failure_or_fault_count: usize,
        store_count: usize,
    ) -> bool {
        let threshold = (store_count / 2) + (store_count % 2);
        failure_or_fault_count >= threshold
    }

    /// Number of stores that may be unreachable while a quorum is still possible.
    pub fn tolerated_faults(store_count: usize) -> usize {
        store_count - Self::threshold(store_count)
    }
}
