//! Committee membership and executor roles

use crate::epoch::EpochTime;
use meridian_primitives::Hash;

/// A single duty a node can hold on the executor committee
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Role {
    /// Executes transaction batches.
    Worker,
    /// Verifies results when a discrepancy is detected.
    BackupWorker,
}

impl Role {
    fn bit(&self) -> u8 {
        match self {
            Role::Worker => 1 << 0,
            Role::BackupWorker => 1 << 1,
        }
    }
}

/// Bitmask of executor roles held by a node
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RoleMask(u8);

impl RoleMask {
    /// Empty role mask
    pub const NONE: RoleMask = RoleMask(0);

    /// Add a role to the mask
    pub fn with(self, role: Role) -> Self {
        RoleMask(self.0 | role.bit())
    }

    /// Check whether the mask contains a role
    pub fn has(&self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    /// Check whether no roles are held
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Raw bitmask value
    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// A member of an executor committee
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommitteeMember {
    /// Node identity key
    pub public_key: Hash,
    /// Role held by this member
    pub role: Role,
}

/// Executor committee for one epoch
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Committee {
    /// Epoch this committee is valid for
    pub valid_for: EpochTime,
    /// Committee members in scheduler-assigned order
    pub members: Vec<CommitteeMember>,
}

impl Committee {
    /// Roles held by the given node on this committee
    pub fn roles_for(&self, public_key: &Hash) -> RoleMask {
        self.members
            .iter()
            .filter(|m| &m.public_key == public_key)
            .fold(RoleMask::NONE, |mask, m| mask.with(m.role))
    }

    /// Workers in committee order
    pub fn workers(&self) -> impl Iterator<Item = &CommitteeMember> {
        self.members.iter().filter(|m| m.role == Role::Worker)
    }

    /// The worker responsible for scheduling transactions in the given
    /// round, chosen round-robin over the worker set.
    pub fn transaction_scheduler(&self, round: u64) -> Option<&CommitteeMember> {
        let workers: Vec<&CommitteeMember> = self.workers().collect();
        if workers.is_empty() {
            return None;
        }
        Some(workers[(round % workers.len() as u64) as usize])
    }
}
