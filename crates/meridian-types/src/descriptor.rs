//! Runtime registration descriptor

use crate::epoch::EpochTime;
use crate::transaction::Weight;
use meridian_primitives::RuntimeId;
use std::collections::BTreeMap;

/// Executor committee parameters
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExecutorParameters {
    /// Size of the executor worker group
    pub group_size: u16,
    /// Size of the backup worker group
    pub group_backup_size: u16,
    /// Round timeout in consensus blocks
    pub round_timeout: u64,
}

impl Default for ExecutorParameters {
    fn default() -> Self {
        Self {
            group_size: 1,
            group_backup_size: 0,
            round_timeout: 5,
        }
    }
}

/// Transaction scheduler parameters
#[derive(Clone, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TxnSchedulerParameters {
    /// Maximum number of queued transactions
    pub max_pool_size: u64,
    /// Per-dimension batch weight limits
    pub weight_limits: BTreeMap<Weight, u64>,
}

/// Registration metadata for a runtime.
///
/// Refreshed only on the first received block or on an explicit epoch
/// transition; retained as-is while the runtime is suspended.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuntimeDescriptor {
    /// Runtime identifier
    pub id: RuntimeId,
    /// Key manager runtime, if this runtime requires one
    pub key_manager: Option<RuntimeId>,
    /// Executor committee parameters
    pub executor: ExecutorParameters,
    /// Transaction scheduler parameters
    pub txn_scheduler: TxnSchedulerParameters,
    /// Epoch at which the descriptor was registered
    pub registered_at: EpochTime,
}

impl RuntimeDescriptor {
    /// Whether this runtime requires a key manager to be available
    /// before it can serve requests.
    pub fn requires_key_manager(&self) -> bool {
        self.key_manager.is_some()
    }
}
