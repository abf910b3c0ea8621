//! Quorum (Redlock-style) acquisition across independent stores.
//!
//! A round writes one fresh token to every store. The lock is held only if
//! a strict majority accepted it and the lease, minus the time the round
//! took and a drift margin, is still positive. Otherwise the round's
//! entries are removed and a new round starts after a jittered delay.
//!
//! See https://redis.io/topics/distlock for the algorithm this follows.

pub mod acquire;
pub mod dispatch;
pub mod helper;
pub mod release;
pub mod timeouts;

pub use helper::QuorumHelper;
pub use release::{ReleaseOutcome, ReleaseReport};
