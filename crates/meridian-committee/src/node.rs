//! Committee coordination node

use crate::config::NodeConfig;
use crate::error::NodeResult;
use crate::group::Group;
use crate::hooks::{NodeEvent, NodeHooks};
use crate::latch::Latch;
use crate::traits::{
    AnnotatedRuntimeBlock, ConsensusBackend, ConsensusError, KeyManagerBuilder, PeerTransport,
    RuntimeHost,
};
use meridian_metrics::Metrics;
use meridian_primitives::RuntimeId;
use meridian_scheduler::{Scheduler, SimpleScheduler};
use meridian_txpool::{PoolResult, PriorityPool};
use meridian_types::{
    BlockInfo, CheckedTransaction, ConsensusLightBlock, EpochTime, HeaderType, HostEvent,
    RoleMask, RuntimeBlock, RuntimeDescriptor, RuntimeEvent, EPOCH_INVALID,
};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Counter of runtime blocks processed by the node.
pub const METRIC_PROCESSED_BLOCKS: &str = "worker_processed_block_count";
/// Counter of runtime events processed by the node.
pub const METRIC_PROCESSED_EVENTS: &str = "worker_processed_event_count";
/// Counter of failed rounds observed by the node.
pub const METRIC_FAILED_ROUNDS: &str = "worker_failed_round_count";
/// Counter of epoch transitions handled by the node.
pub const METRIC_EPOCH_TRANSITIONS: &str = "worker_epoch_transition_count";
/// Gauge holding the current epoch number.
pub const METRIC_EPOCH_NUMBER: &str = "worker_epoch_number";

/// Point-in-time status report of a committee node.
#[derive(Clone, Debug, Default)]
pub struct Status {
    /// Round of the latest processed runtime block.
    pub latest_round: u64,
    /// Consensus height of the latest processed runtime block.
    pub latest_height: u64,
    /// Roles the node holds on the current executor committee.
    pub executor_roles: RoleMask,
    /// Whether the node schedules transactions for the latest round.
    pub is_transaction_scheduler: bool,
    /// Peers subscribed to the runtime's topics.
    pub peers: Vec<String>,
}

/// State guarded by the node's single exclusive lock.
///
/// Every field moves together: a reader holding the lock sees one
/// consistent point in consensus time across block, height, epoch, and
/// descriptor.
struct ProtectedState {
    current_block: Option<RuntimeBlock>,
    current_block_height: u64,
    current_consensus_block: Option<ConsensusLightBlock>,
    current_descriptor: Option<RuntimeDescriptor>,
    current_epoch: EpochTime,
    height: u64,
}

impl Default for ProtectedState {
    fn default() -> Self {
        Self {
            current_block: None,
            current_block_height: 0,
            current_consensus_block: None,
            current_descriptor: None,
            current_epoch: EPOCH_INVALID,
            height: 0,
        }
    }
}

/// Per-runtime committee coordination node.
///
/// Owns the event-merge worker, the lock-protected runtime state, the
/// committee [`Group`], and the transaction pool with its scheduler
/// facade. Constructed with [`Node::new`], started with
/// [`Node::start`], stopped with [`Node::stop`].
pub struct Node {
    config: NodeConfig,
    runtime: Arc<dyn RuntimeHost>,
    consensus: Arc<dyn ConsensusBackend>,
    peers: Arc<dyn PeerTransport>,
    key_manager: Option<Arc<dyn KeyManagerBuilder>>,
    group: Group,
    pool: Arc<PriorityPool>,
    scheduler: Arc<SimpleScheduler>,
    metrics: Arc<Metrics>,
    hooks: RwLock<Vec<Arc<dyn NodeHooks>>>,
    state: Mutex<ProtectedState>,

    stop: Latch,
    quit: Latch,
    init: Latch,
    lifetime: Latch,
}

impl Node {
    /// Create a new committee node.
    pub fn new(
        config: NodeConfig,
        runtime: Arc<dyn RuntimeHost>,
        consensus: Arc<dyn ConsensusBackend>,
        peers: Arc<dyn PeerTransport>,
        key_manager: Option<Arc<dyn KeyManagerBuilder>>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let group = Group::new(config.node_id, config.runtime_id, consensus.clone());
        let pool = Arc::new(PriorityPool::new(config.txpool.clone()));
        let scheduler = Arc::new(SimpleScheduler::with_pool(
            pool.clone(),
            config.txpool.clone(),
        ));
        Arc::new(Self {
            config,
            runtime,
            consensus,
            peers,
            key_manager,
            group,
            pool,
            scheduler,
            metrics,
            hooks: RwLock::new(Vec::new()),
            state: Mutex::new(ProtectedState::default()),
            stop: Latch::new(),
            quit: Latch::new(),
            init: Latch::new(),
            lifetime: Latch::new(),
        })
    }

    /// Identifier of the runtime this node coordinates for.
    pub fn runtime_id(&self) -> RuntimeId {
        self.config.runtime_id
    }

    /// Register a hook. Must be called before [`Node::start`]; hooks
    /// registered later may miss transitions.
    pub fn add_hooks(&self, hooks: Arc<dyn NodeHooks>) {
        self.hooks.write().push(hooks);
    }

    /// The transaction scheduler facade.
    pub fn scheduler(&self) -> Arc<dyn Scheduler> {
        self.scheduler.clone()
    }

    /// Latch fired once the node has observed its first runtime block.
    pub fn initialized(&self) -> &Latch {
        &self.init
    }

    /// Latch fired once the worker has fully terminated.
    pub fn quit(&self) -> &Latch {
        &self.quit
    }

    /// Submit a transaction received from a peer for scheduling.
    ///
    /// Duplicate submissions succeed without growing the queue.
    pub fn handle_peer_tx(&self, tx: CheckedTransaction) -> PoolResult<()> {
        tracing::debug!(hash = %tx.hash(), "queueing peer transaction");
        self.scheduler.queue_tx(tx)
    }

    /// Start the node. Spawns the worker; returns once group services
    /// and the transaction pool have started.
    pub fn start(self: &Arc<Self>) -> NodeResult<()> {
        self.group.start()?;
        self.pool.start()?;

        let node = self.clone();
        tokio::spawn(async move { node.worker().await });
        Ok(())
    }

    /// Request termination. Idempotent; the first call stops the
    /// transaction pool and signals the worker. [`Node::quit`] fires
    /// once the worker has wound down.
    pub fn stop(&self) {
        if self.stop.fire() {
            self.pool.stop();
        }
    }

    /// Report the node's current status.
    pub async fn status(&self) -> Status {
        let state = self.state.lock().await;
        let mut status = Status::default();
        if let Some(block) = &state.current_block {
            status.latest_round = block.round();
            status.latest_height = state.current_block_height;
        }

        let epoch = self.group.get_epoch_snapshot();
        status.executor_roles = epoch.executor_roles();
        status.is_transaction_scheduler = epoch.is_transaction_scheduler(status.latest_round);
        status.peers = self.peers.peers(&self.config.runtime_id);
        status
    }

    async fn worker(self: Arc<Self>) {
        self.run().await;
        // The lifetime ends before the terminal signal fires, so
        // anything gated on the lifetime unblocks first.
        self.lifetime.fire();
        self.quit.fire();
    }

    async fn run(&self) {
        tracing::info!(runtime_id = %self.config.runtime_id, "starting committee node");

        // Gate on consensus sync before touching any runtime state.
        tracing::info!("delaying worker start until after consensus synchronization");
        let mut synced = self.consensus.synced();
        tokio::select! {
            _ = self.stop.wait() => return,
            res = synced.wait_for(|s| *s) => {
                if res.is_err() {
                    tracing::error!("consensus sync status channel closed");
                    return;
                }
            }
        }
        tracing::info!("consensus has finished initial synchronization");

        let descriptor = match self.runtime.active_descriptor().await {
            Ok(descriptor) => descriptor,
            Err(err) => {
                tracing::error!(%err, "failed to wait for registry descriptor");
                return;
            }
        };
        tracing::info!("runtime is registered with the registry");
        {
            let mut state = self.state.lock().await;
            state.current_descriptor = Some(descriptor.clone());
        }

        if descriptor.requires_key_manager() {
            tracing::info!("runtime requires a key manager, waiting for it to be ready");
            let Some(builder) = &self.key_manager else {
                tracing::error!("runtime requires a key manager but none is configured");
                return;
            };
            let client = match builder.build().await {
                Ok(client) => client,
                Err(err) => {
                    tracing::error!(%err, "failed to create key manager client");
                    return;
                }
            };
            // The wait is bounded by the node lifetime, not by the
            // stop request: a stop still lets an in-flight key manager
            // handshake settle before the worker unwinds.
            tokio::select! {
                _ = self.lifetime.wait() => {
                    tracing::error!("failed to wait for key manager");
                    return;
                }
                _ = client.wait_initialized() => {}
            }
            tracing::info!("runtime has a key manager available");
        }

        let mut consensus_blocks = match self.consensus.watch_blocks().await {
            Ok(ch) => ch,
            Err(err) => {
                tracing::error!(%err, "failed to subscribe to consensus blocks");
                return;
            }
        };
        let mut blocks = match self
            .consensus
            .watch_runtime_blocks(self.config.runtime_id)
            .await
        {
            Ok(ch) => ch,
            Err(err) => {
                tracing::error!(%err, "failed to subscribe to runtime blocks");
                return;
            }
        };
        let mut events = match self
            .consensus
            .watch_runtime_events(self.config.runtime_id)
            .await
        {
            Ok(ch) => ch,
            Err(err) => {
                tracing::error!(%err, "failed to subscribe to runtime events");
                return;
            }
        };

        let (hosted, notifier) = match self.runtime.provision().await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::error!(%err, "failed to provision hosted runtime");
                return;
            }
        };
        let mut host_events = match hosted.watch_events().await {
            Ok(ch) => ch,
            Err(err) => {
                tracing::error!(%err, "failed to subscribe to hosted runtime events");
                return;
            }
        };
        if let Err(err) = hosted.start().await {
            tracing::error!(%err, "failed to start hosted runtime");
            return;
        }
        if let Err(err) = notifier.start().await {
            tracing::error!(%err, "failed to start runtime notifier");
            hosted.stop().await;
            return;
        }

        self.event_loop(
            &mut consensus_blocks,
            &mut blocks,
            &mut events,
            &mut host_events,
        )
        .await;

        // Wind down in reverse order of startup.
        notifier.stop().await;
        hosted.stop().await;
    }

    async fn event_loop(
        &self,
        consensus_blocks: &mut mpsc::Receiver<ConsensusLightBlock>,
        blocks: &mut mpsc::Receiver<AnnotatedRuntimeBlock>,
        events: &mut mpsc::Receiver<RuntimeEvent>,
        host_events: &mut mpsc::Receiver<HostEvent>,
    ) {
        let mut first_block_seen = false;
        loop {
            tokio::select! {
                _ = self.stop.wait() => {
                    tracing::info!("termination requested");
                    return;
                }
                blk = consensus_blocks.recv() => {
                    let Some(blk) = blk else { return };
                    let mut state = self.state.lock().await;
                    state.height = blk.height;
                }
                blk = blocks.recv() => {
                    let Some(blk) = blk else { return };
                    if !first_block_seen {
                        first_block_seen = true;
                        tracing::debug!("common worker is initialized");
                        self.init.fire();
                        tracing::debug!("waiting for child worker initialization");
                        if !self.wait_hooks_initialized().await {
                            return;
                        }
                        tracing::debug!("all child workers are initialized");
                    }
                    let mut state = self.state.lock().await;
                    self.handle_new_block(&mut state, blk.block, blk.height).await;
                }
                ev = events.recv() => {
                    let Some(ev) = ev else { return };
                    // Taken for ordering with block processing, not for
                    // any state mutation.
                    let _state = self.state.lock().await;
                    self.handle_new_event(&ev);
                }
                ev = host_events.recv() => {
                    let Some(ev) = ev else { return };
                    self.handle_host_event(&ev);
                }
            }
        }
    }

    async fn wait_hooks_initialized(&self) -> bool {
        let hooks: Vec<Arc<dyn NodeHooks>> = self.hooks.read().clone();
        for hook in hooks {
            tokio::select! {
                _ = hook.initialized().wait() => {}
                _ = self.stop.wait() => {
                    tracing::info!("termination requested while waiting for child workers");
                    return false;
                }
            }
        }
        true
    }

    async fn handle_new_block(
        &self,
        state: &mut ProtectedState,
        blk: RuntimeBlock,
        height: u64,
    ) {
        self.metrics.counter(METRIC_PROCESSED_BLOCKS, 1);

        let first_block = state.current_block.is_none();
        let round = blk.round();

        let consensus_block = match self.consensus.get_light_block(height).await {
            Ok(consensus_block) => consensus_block,
            Err(err) => {
                // Without the matching light block the update is
                // dropped whole; state stays at the previous block.
                tracing::error!(%err, height, round, "failed to query light block");
                return;
            }
        };

        state.current_block = Some(blk.clone());
        state.current_block_height = height;
        state.current_consensus_block = Some(consensus_block.clone());

        let header_type = blk.header.header_type;
        if first_block || header_type == HeaderType::EpochTransition {
            match self
                .consensus
                .get_runtime_descriptor(self.config.runtime_id, height)
                .await
            {
                Ok(descriptor) => state.current_descriptor = Some(descriptor),
                Err(ConsensusError::NoSuchRuntime) => {
                    // Likely suspended; keep the last known descriptor.
                }
                Err(err) => {
                    tracing::error!(%err, "failed to query runtime descriptor");
                    return;
                }
            }
            match self.consensus.get_epoch(height).await {
                Ok(epoch) => state.current_epoch = epoch,
                Err(err) => {
                    tracing::error!(%err, "failed to fetch current epoch");
                    return;
                }
            }
        }

        self.dispatch_event(&NodeEvent::NewBlockEarly(blk.clone()));

        match header_type {
            HeaderType::Normal | HeaderType::RoundFailed if first_block => {
                // The committee view is unknown until the first epoch
                // transition; force one off the first observed block.
                tracing::warn!(round, "forcing an epoch transition on first received block");
                self.handle_epoch_transition(height).await;
            }
            HeaderType::Normal => {
                self.group.round_transition();
                self.dispatch_event(&NodeEvent::RoundTransition);
            }
            HeaderType::RoundFailed => {
                tracing::warn!(round, "round has failed");
                self.group.round_transition();
                self.dispatch_event(&NodeEvent::RoundTransition);
                self.metrics.counter(METRIC_FAILED_ROUNDS, 1);
            }
            HeaderType::EpochTransition => {
                self.handle_epoch_transition(height).await;
            }
            HeaderType::Suspended => {
                self.handle_suspend();
            }
            HeaderType::Unknown(kind) => {
                tracing::error!(kind, round, "invalid block header type");
                return;
            }
        }

        let info = BlockInfo {
            runtime_block: blk.clone(),
            consensus_block,
            epoch: state.current_epoch,
            active_descriptor: state.current_descriptor.clone(),
        };
        if let Err(err) = self.pool.process_block(&info) {
            tracing::error!(%err, round, "failed to process block in transaction pool");
        }

        self.dispatch_event(&NodeEvent::NewBlock(blk));
    }

    async fn handle_epoch_transition(&self, height: u64) {
        tracing::info!(height, "epoch transition has occurred");
        self.metrics.counter(METRIC_EPOCH_TRANSITIONS, 1);

        if let Err(err) = self.group.epoch_transition(height).await {
            tracing::error!(%err, "unable to handle epoch transition");
        }
        let epoch = self.group.get_epoch_snapshot();
        self.metrics
            .gauge(METRIC_EPOCH_NUMBER, epoch.epoch_number() as i64);
        self.dispatch_event(&NodeEvent::EpochTransition(epoch));
    }

    fn handle_suspend(&self) {
        tracing::warn!("runtime has been suspended");
        self.group.suspend();
        let epoch = self.group.get_epoch_snapshot();
        self.dispatch_event(&NodeEvent::EpochTransition(epoch));
    }

    fn handle_new_event(&self, event: &RuntimeEvent) {
        self.metrics.counter(METRIC_PROCESSED_EVENTS, 1);
        tracing::debug!(round = event.round, "got runtime event");
        self.dispatch_event(&NodeEvent::RuntimeEvent(event.clone()));
    }

    fn handle_host_event(&self, event: &HostEvent) {
        let hooks: Vec<Arc<dyn NodeHooks>> = self.hooks.read().clone();
        for hook in hooks {
            hook.handle_host_event(event);
        }
    }

    fn dispatch_event(&self, event: &NodeEvent) {
        let hooks: Vec<Arc<dyn NodeHooks>> = self.hooks.read().clone();
        for hook in hooks {
            hook.handle_event(event);
        }
    }
}
