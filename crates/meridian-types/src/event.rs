//! Runtime and hosted-runtime events

use meridian_primitives::{Hash, RuntimeId};

/// Kind of a roothash runtime event
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RuntimeEventKind {
    /// An executor has committed results for the round.
    ExecutorCommitted {
        /// Committing node identity
        node_id: Hash,
    },
    /// A discrepancy between executor results was detected.
    ExecutionDiscrepancyDetected {
        /// Whether the discrepancy was detected on timeout
        timeout: bool,
    },
    /// The round has been finalized.
    Finalized,
}

/// A roothash event observed for a runtime round
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuntimeEvent {
    /// Runtime the event belongs to
    pub runtime_id: RuntimeId,
    /// Round the event belongs to
    pub round: u64,
    /// Event kind
    pub kind: RuntimeEventKind,
}

/// Lifecycle event emitted by the hosted execution runtime
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HostEvent {
    /// The hosted runtime has started and can accept requests.
    Started,
    /// The hosted runtime failed to start.
    FailedToStart(String),
    /// The hosted runtime has stopped.
    Stopped,
}
