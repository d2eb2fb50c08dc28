//! Hook interface for components listening to node state transitions

use crate::group::EpochSnapshot;
use crate::latch::Latch;
use meridian_types::{HostEvent, RuntimeBlock, RuntimeEvent};

/// State transitions dispatched to registered hooks.
///
/// Block-derived events are dispatched while the node holds its state
/// lock, so a hook observes them in finalization order and may read a
/// consistent node status from within the callback path.
#[derive(Clone, Debug)]
pub enum NodeEvent {
    /// The committee changed, either through an explicit epoch
    /// transition, a forced transition on the first observed block, or
    /// a runtime suspension. The snapshot carries the new committee
    /// view; [`EpochSnapshot::is_suspended`] distinguishes suspension.
    EpochTransition(EpochSnapshot),
    /// A round finished without changing the committee.
    RoundTransition,
    /// A block was finalized and the node state already reflects it,
    /// but epoch and committee handling has not run yet.
    NewBlockEarly(RuntimeBlock),
    /// A block was fully processed, including epoch and pool updates.
    NewBlock(RuntimeBlock),
    /// The runtime emitted an event.
    RuntimeEvent(RuntimeEvent),
}

/// Implemented by components that track the committee node.
pub trait NodeHooks: Send + Sync {
    /// Handle a state transition. Called under the node's state lock.
    fn handle_event(&self, event: &NodeEvent);

    /// Handle a hosted-runtime lifecycle event. Not called under the
    /// state lock.
    fn handle_host_event(&self, _event: &HostEvent) {}

    /// Readiness latch of the hook. The node delays block processing
    /// until every registered hook has fired its latch.
    fn initialized(&self) -> &Latch;
}
