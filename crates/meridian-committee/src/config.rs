//! Committee node configuration

use meridian_primitives::{Hash, RuntimeId};
use meridian_txpool::PoolConfig;

/// Static configuration of a committee node.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeConfig {
    /// Identifier of the runtime the node coordinates for.
    pub runtime_id: RuntimeId,
    /// Public identity of the local node, used for committee role
    /// checks.
    pub node_id: Hash,
    /// Transaction pool configuration.
    pub txpool: PoolConfig,
}

impl NodeConfig {
    /// Configuration with default pool settings.
    pub fn new(runtime_id: RuntimeId, node_id: Hash) -> Self {
        Self {
            runtime_id,
            node_id,
            txpool: PoolConfig::default(),
        }
    }
}
