//! Epoch time

/// Monotonically increasing epoch counter
pub type EpochTime = u64;

/// Sentinel for an epoch that has not been observed yet
pub const EPOCH_INVALID: EpochTime = u64::MAX;
