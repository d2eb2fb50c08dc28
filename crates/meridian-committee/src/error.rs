//! Committee node errors

use crate::group::GroupError;
use meridian_txpool::PoolError;
use thiserror::Error;

/// Errors surfaced when starting the committee node.
///
/// Failures inside the running worker are logged and terminate the
/// worker rather than being returned to the caller.
#[derive(Debug, Error)]
pub enum NodeError {
    /// Group services failed to start.
    #[error("failed to start group services: {0}")]
    Group(#[from] GroupError),
    /// The transaction pool failed to start.
    #[error("failed to start transaction pool: {0}")]
    Pool(#[from] PoolError),
}

/// Result alias for committee node operations.
pub type NodeResult<T> = Result<T, NodeError>;
