//! Validity window arithmetic.

use std::time::Duration;

/// Time the lock is still provably held after a successful round.
///
/// `lease - elapsed - drift`, or `None` when that is not strictly positive.
pub fn validity_window(lease: Duration, elapsed: Duration, drift: Duration) -> Option<Duration> {
    lease
        .checked_sub(elapsed)
        .and_then(|rest| rest.checked_sub(drift))
        .filter(|validity| !validity.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_window() {
        assert_eq!(
            validity_window(
                Duration::from_secs(10),
                Duration::from_millis(40),
                Duration::from_millis(102)
            ),
            Some(Duration::from_millis(9858))
        );
    }

    #[test]
    fn test_window_exactly_zero_is_not_valid() {
        assert_eq!(
            validity_window(
                Duration::from_millis(100),
                Duration::from_millis(90),
                Duration::from_millis(10)
            ),
            None
        );
    }

    #[test]
    fn test_round_slower_than_lease() {
        assert_eq!(
            validity_window(
                Duration::from_millis(100),
                Duration::from_millis(150),
                Duration::ZERO
            ),
            None
        );
    }
}
