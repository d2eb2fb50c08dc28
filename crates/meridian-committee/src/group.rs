//! Committee group tracking

use crate::traits::{ConsensusBackend, ConsensusError};
use meridian_primitives::{Hash, RuntimeId};
use meridian_types::{Committee, EpochTime, Role, RoleMask, EPOCH_INVALID};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by the committee group.
#[derive(Debug, Error)]
pub enum GroupError {
    /// The local node identity is not set.
    #[error("group: missing node identity")]
    MissingIdentity,
    /// A consensus query failed.
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
}

/// Immutable view of the committee as of one epoch transition.
///
/// Snapshots are cheap to clone and remain valid after further
/// transitions; role checks answer for the epoch the snapshot was
/// taken in.
#[derive(Clone, Debug)]
pub struct EpochSnapshot {
    epoch_number: EpochTime,
    executor_roles: RoleMask,
    committee: Option<Committee>,
    node_id: Hash,
    suspended: bool,
}

impl EpochSnapshot {
    /// Epoch number the snapshot was taken in.
    pub fn epoch_number(&self) -> EpochTime {
        self.epoch_number
    }

    /// Roles the local node holds on the executor committee.
    pub fn executor_roles(&self) -> RoleMask {
        self.executor_roles
    }

    /// Whether the local node is an executor worker.
    pub fn is_executor_worker(&self) -> bool {
        self.executor_roles.has(Role::Worker)
    }

    /// Whether the local node is an executor backup worker.
    pub fn is_executor_backup_worker(&self) -> bool {
        self.executor_roles.has(Role::BackupWorker)
    }

    /// Whether the local node is the transaction scheduler for the
    /// given round.
    pub fn is_transaction_scheduler(&self, round: u64) -> bool {
        if self.suspended {
            return false;
        }
        self.committee
            .as_ref()
            .and_then(|committee| committee.transaction_scheduler(round))
            .map(|member| member.public_key == self.node_id)
            .unwrap_or(false)
    }

    /// Whether the runtime was suspended when the snapshot was taken.
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// The executor committee, if one is known.
    pub fn committee(&self) -> Option<&Committee> {
        self.committee.as_ref()
    }
}

struct GroupState {
    epoch: EpochTime,
    committee: Option<Committee>,
    suspended: bool,
}

/// Tracks the executor committee of a runtime across epoch
/// transitions and answers role queries for the local node.
pub struct Group {
    node_id: Hash,
    runtime_id: RuntimeId,
    consensus: Arc<dyn ConsensusBackend>,
    state: RwLock<GroupState>,
}

impl Group {
    /// Create a group for the given runtime and local node identity.
    pub fn new(node_id: Hash, runtime_id: RuntimeId, consensus: Arc<dyn ConsensusBackend>) -> Self {
        Self {
            node_id,
            runtime_id,
            consensus,
            state: RwLock::new(GroupState {
                epoch: EPOCH_INVALID,
                committee: None,
                suspended: false,
            }),
        }
    }

    /// Start the group services.
    pub fn start(&self) -> Result<(), GroupError> {
        if self.node_id.is_zero() {
            return Err(GroupError::MissingIdentity);
        }
        tracing::info!(runtime_id = %self.runtime_id, "starting group services");
        Ok(())
    }

    /// Handle an epoch transition at the given consensus height,
    /// refreshing the epoch number and executor committee.
    pub async fn epoch_transition(&self, height: u64) -> Result<(), GroupError> {
        let epoch = self.consensus.get_epoch(height).await?;
        let committee = self
            .consensus
            .executor_committee(self.runtime_id, height)
            .await?;

        let mut state = self.state.write();
        state.epoch = epoch;
        state.committee = Some(committee);
        state.suspended = false;
        tracing::debug!(epoch, height, "epoch transition complete");
        Ok(())
    }

    /// Handle a round transition without a committee change.
    pub fn round_transition(&self) {
        tracing::debug!("round transition");
    }

    /// Mark the runtime as suspended. The committee of the last active
    /// epoch is retained but all role checks answer negatively until
    /// the next epoch transition.
    pub fn suspend(&self) {
        let mut state = self.state.write();
        state.suspended = true;
        tracing::debug!(epoch = state.epoch, "runtime suspended");
    }

    /// Take a snapshot of the current committee view.
    pub fn get_epoch_snapshot(&self) -> EpochSnapshot {
        let state = self.state.read();
        let executor_roles = if state.suspended {
            RoleMask::NONE
        } else {
            state
                .committee
                .as_ref()
                .map(|committee| committee.roles_for(&self.node_id))
                .unwrap_or(RoleMask::NONE)
        };
        EpochSnapshot {
            epoch_number: state.epoch,
            executor_roles,
            committee: state.committee.clone(),
            node_id: self.node_id,
            suspended: state.suspended,
        }
    }
}
