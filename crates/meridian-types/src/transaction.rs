//! Checked transactions and weight vectors

use crate::block::{ConsensusLightBlock, RuntimeBlock};
use crate::descriptor::RuntimeDescriptor;
use crate::epoch::EpochTime;
use bytes::Bytes;
use meridian_primitives::Hash;
use std::collections::BTreeMap;
use std::fmt;

/// A resource-consumption dimension bounding pool and batch capacity
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Weight {
    /// Number of transactions
    Count,
    /// Total size in bytes
    SizeBytes,
    /// Runtime-specific dimension
    Custom(String),
}

impl fmt::Display for Weight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Weight::Count => write!(f, "count"),
            Weight::SizeBytes => write!(f, "size_bytes"),
            Weight::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// A candidate transaction that has passed checking, with a
/// content-derived identifier and a declared weight vector.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckedTransaction {
    raw: Bytes,
    hash: Hash,
    priority: u64,
    weights: BTreeMap<Weight, u64>,
    expiry_epoch: Option<EpochTime>,
}

impl CheckedTransaction {
    /// Create a checked transaction. The identifier is derived from the
    /// raw content; `Count` and `SizeBytes` weights are filled in
    /// automatically.
    pub fn new(raw: Bytes, priority: u64, mut weights: BTreeMap<Weight, u64>) -> Self {
        let hash = Hash::digest(&raw);
        weights.insert(Weight::Count, 1);
        weights.insert(Weight::SizeBytes, raw.len() as u64);
        Self {
            raw,
            hash,
            priority,
            weights,
            expiry_epoch: None,
        }
    }

    /// Set the epoch after which this transaction is no longer valid.
    pub fn with_expiry(mut self, epoch: EpochTime) -> Self {
        self.expiry_epoch = Some(epoch);
        self
    }

    /// Raw transaction bytes
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Content-derived identifier
    pub fn hash(&self) -> Hash {
        self.hash
    }

    /// Scheduling priority (higher schedules first)
    pub fn priority(&self) -> u64 {
        self.priority
    }

    /// Declared weight for the given dimension (0 if undeclared)
    pub fn weight(&self, w: &Weight) -> u64 {
        self.weights.get(w).copied().unwrap_or(0)
    }

    /// Full declared weight vector
    pub fn weights(&self) -> &BTreeMap<Weight, u64> {
        &self.weights
    }

    /// Whether the transaction's validity window has elapsed at the
    /// given epoch.
    pub fn is_expired(&self, epoch: EpochTime) -> bool {
        matches!(self.expiry_epoch, Some(e) if e < epoch)
    }
}

/// Block context fed into the transaction pool on every processed
/// runtime block.
#[derive(Clone, Debug)]
pub struct BlockInfo {
    /// The committed runtime block
    pub runtime_block: RuntimeBlock,
    /// The consensus light block at the same height
    pub consensus_block: ConsensusLightBlock,
    /// Current epoch
    pub epoch: EpochTime,
    /// Active runtime descriptor, if known
    pub active_descriptor: Option<RuntimeDescriptor>,
}
