//! Ownership tokens for store-backed acquisitions.

use std::fmt;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Unguessable value proving ownership of one acquisition attempt.
///
/// A fresh token is generated for every attempt; it is written as the
/// store value and must match for a compare-and-delete release.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Generates a new token.
    ///
    /// Format: `{process_id}_{counter}_{128 random bits in hex}`
    pub fn generate() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let counter = COUNTER.fetch_add(1, Ordering::Relaxed);
        let random: u128 = rand::thread_rng().r#gen();
        Self(format!("{}_{}_{:032x}", process::id(), counter, random))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

// Tokens end up in logs; only a prefix is shown.
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = self.0.get(..12).unwrap_or(&self.0);
        write!(f, "Token({shown}..)")
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
