//! Runtime block types

use bytes::Bytes;
use meridian_primitives::{Hash, RuntimeId};

/// Runtime block header type.
///
/// The wire encoding is an open u8; values outside the known set are
/// preserved as [`HeaderType::Unknown`] so the node can observe (and
/// discard) blocks produced by newer header kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum HeaderType {
    /// Normal round.
    Normal,
    /// Round has failed.
    RoundFailed,
    /// Epoch transition block.
    EpochTransition,
    /// Runtime has been suspended.
    Suspended,
    /// Unrecognized header type.
    Unknown(u8),
}

impl HeaderType {
    /// Decode from the wire byte.
    pub fn from_u8(v: u8) -> Self {
        match v {
            0 => HeaderType::Normal,
            1 => HeaderType::RoundFailed,
            2 => HeaderType::EpochTransition,
            3 => HeaderType::Suspended,
            other => HeaderType::Unknown(other),
        }
    }

    /// Encode to the wire byte.
    pub fn as_u8(&self) -> u8 {
        match self {
            HeaderType::Normal => 0,
            HeaderType::RoundFailed => 1,
            HeaderType::EpochTransition => 2,
            HeaderType::Suspended => 3,
            HeaderType::Unknown(v) => *v,
        }
    }
}

/// Runtime block header
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockHeader {
    /// Runtime this block belongs to
    pub runtime_id: RuntimeId,
    /// Round number
    pub round: u64,
    /// Block timestamp (unix seconds)
    pub timestamp: u64,
    /// Header type
    pub header_type: HeaderType,
    /// Hash of the previous block header
    pub previous_hash: Hash,
}

/// Runtime block, immutable once received
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RuntimeBlock {
    /// Block header
    pub header: BlockHeader,
    /// Opaque block payload
    pub payload: Bytes,
}

impl RuntimeBlock {
    /// Round number shorthand
    pub fn round(&self) -> u64 {
        self.header.round
    }
}

/// Consensus-layer light block at a given height
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsensusLightBlock {
    /// Consensus height
    pub height: u64,
    /// Opaque light block metadata
    pub meta: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_type_roundtrip() {
        for v in 0u8..6 {
            assert_eq!(HeaderType::from_u8(v).as_u8(), v);
        }
    }

    #[test]
    fn test_header_type_unknown() {
        assert_eq!(HeaderType::from_u8(42), HeaderType::Unknown(42));
    }
}
