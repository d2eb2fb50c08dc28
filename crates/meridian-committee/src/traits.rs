//! Capability traits for external collaborators.
//!
//! The committee node only ever sees its environment through these
//! traits. Production wiring hands in consensus and runtime-host
//! clients; tests hand in channel-backed mocks.

use async_trait::async_trait;
use meridian_primitives::RuntimeId;
use meridian_types::{
    Committee, ConsensusLightBlock, EpochTime, HostEvent, RuntimeBlock, RuntimeDescriptor,
    RuntimeEvent,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, watch};

/// Errors reported by a consensus backend.
#[derive(Debug, Error)]
pub enum ConsensusError {
    /// The queried runtime is not registered at the given height.
    ///
    /// Distinguished from other failures: a missing runtime during an
    /// epoch transition usually means a suspension, which the node
    /// tolerates by retaining its last known descriptor.
    #[error("consensus: no such runtime")]
    NoSuchRuntime,
    /// Any other backend failure.
    #[error("consensus: {0}")]
    Backend(String),
}

/// Errors reported by the runtime host.
#[derive(Debug, Error)]
#[error("runtime host: {0}")]
pub struct RuntimeHostError(pub String);

/// Errors reported by the key manager subsystem.
#[derive(Debug, Error)]
#[error("key manager: {0}")]
pub struct KeyManagerError(pub String);

/// A runtime block together with the consensus height at which it was
/// finalized.
#[derive(Clone, Debug)]
pub struct AnnotatedRuntimeBlock {
    /// The finalized runtime block.
    pub block: RuntimeBlock,
    /// Consensus height of finalization.
    pub height: u64,
}

/// Read and subscription interface onto the consensus layer.
#[async_trait]
pub trait ConsensusBackend: Send + Sync {
    /// Sync status channel; holds `true` once initial synchronization
    /// has completed.
    fn synced(&self) -> watch::Receiver<bool>;

    /// Subscribe to finalized consensus blocks.
    async fn watch_blocks(&self) -> Result<mpsc::Receiver<ConsensusLightBlock>, ConsensusError>;

    /// Subscribe to finalized blocks of the given runtime, annotated
    /// with their consensus height.
    async fn watch_runtime_blocks(
        &self,
        runtime_id: RuntimeId,
    ) -> Result<mpsc::Receiver<AnnotatedRuntimeBlock>, ConsensusError>;

    /// Subscribe to events emitted by the given runtime.
    async fn watch_runtime_events(
        &self,
        runtime_id: RuntimeId,
    ) -> Result<mpsc::Receiver<RuntimeEvent>, ConsensusError>;

    /// Fetch the light block at the given height.
    async fn get_light_block(&self, height: u64) -> Result<ConsensusLightBlock, ConsensusError>;

    /// Fetch the registry descriptor of the given runtime as of the
    /// given height.
    async fn get_runtime_descriptor(
        &self,
        runtime_id: RuntimeId,
        height: u64,
    ) -> Result<RuntimeDescriptor, ConsensusError>;

    /// Fetch the epoch number at the given height.
    async fn get_epoch(&self, height: u64) -> Result<EpochTime, ConsensusError>;

    /// Fetch the executor committee of the given runtime as of the
    /// given height.
    async fn executor_committee(
        &self,
        runtime_id: RuntimeId,
        height: u64,
    ) -> Result<Committee, ConsensusError>;
}

/// Host-side management of the local runtime binary.
#[async_trait]
pub trait RuntimeHost: Send + Sync {
    /// Identifier of the hosted runtime.
    fn id(&self) -> RuntimeId;

    /// Wait for the runtime to be registered and return its active
    /// descriptor.
    async fn active_descriptor(&self) -> Result<RuntimeDescriptor, RuntimeHostError>;

    /// Provision the hosted runtime and its notifier.
    async fn provision(
        &self,
    ) -> Result<(Arc<dyn HostedRuntime>, Arc<dyn RuntimeNotifier>), RuntimeHostError>;
}

/// A provisioned runtime instance.
#[async_trait]
pub trait HostedRuntime: Send + Sync {
    /// Subscribe to lifecycle events of the runtime.
    async fn watch_events(&self) -> Result<mpsc::Receiver<HostEvent>, RuntimeHostError>;

    /// Start the runtime.
    async fn start(&self) -> Result<(), RuntimeHostError>;

    /// Stop the runtime.
    async fn stop(&self);
}

/// Pushes consensus-tracked state into the hosted runtime.
#[async_trait]
pub trait RuntimeNotifier: Send + Sync {
    /// Start the notifier.
    async fn start(&self) -> Result<(), RuntimeHostError>;

    /// Stop the notifier.
    async fn stop(&self);
}

/// Builds a key manager client on demand.
#[async_trait]
pub trait KeyManagerBuilder: Send + Sync {
    /// Construct a client for the runtime's key manager.
    async fn build(&self) -> Result<Arc<dyn KeyManagerClient>, KeyManagerError>;
}

/// Client handle onto a key manager runtime.
#[async_trait]
pub trait KeyManagerClient: Send + Sync {
    /// Wait until the key manager is initialized and able to serve
    /// requests.
    async fn wait_initialized(&self);
}

/// View of the peer-to-peer layer, used for status reporting.
pub trait PeerTransport: Send + Sync {
    /// Addresses of peers subscribed to the given runtime's topics.
    fn peers(&self, runtime_id: &RuntimeId) -> Vec<String>;
}
