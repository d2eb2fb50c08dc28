//! Transaction pool error types

use meridian_primitives::Hash;
use meridian_types::Weight;
use thiserror::Error;

/// Transaction pool errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Transaction with an identical identifier is already queued
    #[error("transaction already exists: {0}")]
    AlreadyExists(Hash),

    /// Pool is at capacity
    #[error("pool is full (size: {size}, max size: {max_size})")]
    Full {
        /// Current queue size
        size: u64,
        /// Configured maximum pool size
        max_size: u64,
    },

    /// Declared weight exceeds a configured limit
    #[error("weight limit reached for {weight}: {declared} > {limit}")]
    WeightLimitReached {
        /// Weight dimension
        weight: Weight,
        /// Declared transaction weight
        declared: u64,
        /// Configured limit
        limit: u64,
    },

    /// Pool lifecycle was started twice
    #[error("pool is already running")]
    AlreadyRunning,
}

/// Result type for transaction pool operations
pub type PoolResult<T> = Result<T, PoolError>;
