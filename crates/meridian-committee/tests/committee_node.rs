//! End-to-end tests of the committee node against channel-backed
//! mock collaborators.

use async_trait::async_trait;
use bytes::Bytes;
use meridian_committee::traits::{
    AnnotatedRuntimeBlock, ConsensusBackend, ConsensusError, HostedRuntime, KeyManagerBuilder,
    KeyManagerClient, KeyManagerError, PeerTransport, RuntimeHost, RuntimeHostError,
    RuntimeNotifier,
};
use meridian_committee::{Latch, Node, NodeConfig, NodeEvent, NodeHooks};
use meridian_metrics::Metrics;
use meridian_primitives::{Hash, RuntimeId};
use meridian_types::{
    BlockHeader, CheckedTransaction, Committee, CommitteeMember, ConsensusLightBlock, EpochTime,
    ExecutorParameters, HeaderType, HostEvent, Role, RuntimeBlock, RuntimeDescriptor,
    RuntimeEvent, RuntimeEventKind, TxnSchedulerParameters,
};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep, timeout};

const RUNTIME_ID: [u8; 32] = [7u8; 32];
const NODE_ID: [u8; 32] = [1u8; 32];

fn runtime_id() -> RuntimeId {
    RuntimeId::from_bytes(RUNTIME_ID)
}

fn node_id() -> Hash {
    Hash::from_bytes(NODE_ID)
}

fn descriptor(key_manager: Option<RuntimeId>) -> RuntimeDescriptor {
    RuntimeDescriptor {
        id: runtime_id(),
        key_manager,
        executor: ExecutorParameters::default(),
        txn_scheduler: TxnSchedulerParameters::default(),
        registered_at: 0,
    }
}

fn block(round: u64, header_type: HeaderType) -> AnnotatedRuntimeBlock {
    AnnotatedRuntimeBlock {
        block: RuntimeBlock {
            header: BlockHeader {
                runtime_id: runtime_id(),
                round,
                timestamp: 1_700_000_000 + round,
                header_type,
                previous_hash: Hash::ZERO,
            },
            payload: Bytes::new(),
        },
        height: 100 + round,
    }
}

enum DescriptorMode {
    Available,
    NoSuchRuntime,
}

struct MockConsensus {
    synced: watch::Sender<bool>,
    consensus_blocks: Mutex<Option<mpsc::Receiver<ConsensusLightBlock>>>,
    runtime_blocks: Mutex<Option<mpsc::Receiver<AnnotatedRuntimeBlock>>>,
    runtime_events: Mutex<Option<mpsc::Receiver<RuntimeEvent>>>,
    epoch: AtomicU64,
    committee: Mutex<Committee>,
    descriptor_mode: Mutex<DescriptorMode>,
    fail_light_blocks: AtomicBool,
    light_block_delay: Mutex<Option<Duration>>,
}

#[async_trait]
impl ConsensusBackend for MockConsensus {
    fn synced(&self) -> watch::Receiver<bool> {
        self.synced.subscribe()
    }

    async fn watch_blocks(&self) -> Result<mpsc::Receiver<ConsensusLightBlock>, ConsensusError> {
        Ok(self.consensus_blocks.lock().take().unwrap())
    }

    async fn watch_runtime_blocks(
        &self,
        _runtime_id: RuntimeId,
    ) -> Result<mpsc::Receiver<AnnotatedRuntimeBlock>, ConsensusError> {
        Ok(self.runtime_blocks.lock().take().unwrap())
    }

    async fn watch_runtime_events(
        &self,
        _runtime_id: RuntimeId,
    ) -> Result<mpsc::Receiver<RuntimeEvent>, ConsensusError> {
        Ok(self.runtime_events.lock().take().unwrap())
    }

    async fn get_light_block(&self, height: u64) -> Result<ConsensusLightBlock, ConsensusError> {
        let delay = *self.light_block_delay.lock();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
        if self.fail_light_blocks.load(Ordering::SeqCst) {
            return Err(ConsensusError::Backend("light block unavailable".into()));
        }
        Ok(ConsensusLightBlock {
            height,
            meta: Bytes::new(),
        })
    }

    async fn get_runtime_descriptor(
        &self,
        _runtime_id: RuntimeId,
        _height: u64,
    ) -> Result<RuntimeDescriptor, ConsensusError> {
        match *self.descriptor_mode.lock() {
            DescriptorMode::Available => Ok(descriptor(None)),
            DescriptorMode::NoSuchRuntime => Err(ConsensusError::NoSuchRuntime),
        }
    }

    async fn get_epoch(&self, _height: u64) -> Result<EpochTime, ConsensusError> {
        Ok(self.epoch.load(Ordering::SeqCst))
    }

    async fn executor_committee(
        &self,
        _runtime_id: RuntimeId,
        _height: u64,
    ) -> Result<Committee, ConsensusError> {
        Ok(self.committee.lock().clone())
    }
}

struct MockHosted {
    host_events: Mutex<Option<mpsc::Receiver<HostEvent>>>,
    shutdown_log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl HostedRuntime for MockHosted {
    async fn watch_events(&self) -> Result<mpsc::Receiver<HostEvent>, RuntimeHostError> {
        Ok(self.host_events.lock().take().unwrap())
    }

    async fn start(&self) -> Result<(), RuntimeHostError> {
        Ok(())
    }

    async fn stop(&self) {
        self.shutdown_log.lock().push("hosted");
    }
}

struct MockNotifier {
    shutdown_log: Arc<Mutex<Vec<&'static str>>>,
}

#[async_trait]
impl RuntimeNotifier for MockNotifier {
    async fn start(&self) -> Result<(), RuntimeHostError> {
        Ok(())
    }

    async fn stop(&self) {
        self.shutdown_log.lock().push("notifier");
    }
}

struct MockHost {
    descriptor: RuntimeDescriptor,
    hosted: Arc<MockHosted>,
    notifier: Arc<MockNotifier>,
}

#[async_trait]
impl RuntimeHost for MockHost {
    fn id(&self) -> RuntimeId {
        runtime_id()
    }

    async fn active_descriptor(&self) -> Result<RuntimeDescriptor, RuntimeHostError> {
        Ok(self.descriptor.clone())
    }

    async fn provision(
        &self,
    ) -> Result<(Arc<dyn HostedRuntime>, Arc<dyn RuntimeNotifier>), RuntimeHostError> {
        Ok((self.hosted.clone(), self.notifier.clone()))
    }
}

struct MockKeyManager {
    ready: Arc<Latch>,
}

#[async_trait]
impl KeyManagerBuilder for MockKeyManager {
    async fn build(&self) -> Result<Arc<dyn KeyManagerClient>, KeyManagerError> {
        Ok(Arc::new(MockKeyManagerClient {
            ready: self.ready.clone(),
        }))
    }
}

struct MockKeyManagerClient {
    ready: Arc<Latch>,
}

#[async_trait]
impl KeyManagerClient for MockKeyManagerClient {
    async fn wait_initialized(&self) {
        self.ready.wait().await;
    }
}

struct StaticPeers(Vec<String>);

impl PeerTransport for StaticPeers {
    fn peers(&self, _runtime_id: &RuntimeId) -> Vec<String> {
        self.0.clone()
    }
}

struct RecordingHook {
    events: Mutex<Vec<String>>,
    host_events: Mutex<Vec<HostEvent>>,
    init: Latch,
}

impl RecordingHook {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
            host_events: Mutex::new(Vec::new()),
            init: Latch::new(),
        })
    }

    fn labels(&self) -> Vec<String> {
        self.events.lock().clone()
    }
}

impl NodeHooks for RecordingHook {
    fn handle_event(&self, event: &NodeEvent) {
        let label = match event {
            NodeEvent::EpochTransition(epoch) if epoch.is_suspended() => "suspend".to_string(),
            NodeEvent::EpochTransition(_) => "epoch_transition".to_string(),
            NodeEvent::RoundTransition => "round_transition".to_string(),
            NodeEvent::NewBlockEarly(block) => format!("new_block_early:{}", block.round()),
            NodeEvent::NewBlock(block) => format!("new_block:{}", block.round()),
            NodeEvent::RuntimeEvent(event) => format!("runtime_event:{}", event.round),
        };
        self.events.lock().push(label);
    }

    fn handle_host_event(&self, event: &HostEvent) {
        self.host_events.lock().push(event.clone());
    }

    fn initialized(&self) -> &Latch {
        &self.init
    }
}

struct Harness {
    node: Arc<Node>,
    consensus: Arc<MockConsensus>,
    metrics: Arc<Metrics>,
    hook: Arc<RecordingHook>,
    block_tx: mpsc::Sender<AnnotatedRuntimeBlock>,
    consensus_block_tx: mpsc::Sender<ConsensusLightBlock>,
    event_tx: mpsc::Sender<RuntimeEvent>,
    host_event_tx: mpsc::Sender<HostEvent>,
    shutdown_log: Arc<Mutex<Vec<&'static str>>>,
    km_ready: Arc<Latch>,
}

fn harness(key_manager: bool) -> Harness {
    let (consensus_block_tx, consensus_block_rx) = mpsc::channel(16);
    let (block_tx, block_rx) = mpsc::channel(16);
    let (event_tx, event_rx) = mpsc::channel(16);
    let (host_event_tx, host_event_rx) = mpsc::channel(16);
    let (synced_tx, _) = watch::channel(true);

    let consensus = Arc::new(MockConsensus {
        synced: synced_tx,
        consensus_blocks: Mutex::new(Some(consensus_block_rx)),
        runtime_blocks: Mutex::new(Some(block_rx)),
        runtime_events: Mutex::new(Some(event_rx)),
        epoch: AtomicU64::new(5),
        committee: Mutex::new(Committee {
            valid_for: 5,
            members: vec![CommitteeMember {
                public_key: node_id(),
                role: Role::Worker,
            }],
        }),
        descriptor_mode: Mutex::new(DescriptorMode::Available),
        fail_light_blocks: AtomicBool::new(false),
        light_block_delay: Mutex::new(None),
    });

    let shutdown_log = Arc::new(Mutex::new(Vec::new()));
    let km = Some(RuntimeId::from_bytes([9u8; 32])).filter(|_| key_manager);
    let host = Arc::new(MockHost {
        descriptor: descriptor(km),
        hosted: Arc::new(MockHosted {
            host_events: Mutex::new(Some(host_event_rx)),
            shutdown_log: shutdown_log.clone(),
        }),
        notifier: Arc::new(MockNotifier {
            shutdown_log: shutdown_log.clone(),
        }),
    });

    let km_ready = Arc::new(Latch::new());
    let builder: Option<Arc<dyn KeyManagerBuilder>> = Some(Arc::new(MockKeyManager {
        ready: km_ready.clone(),
    }));

    let metrics = Arc::new(Metrics::new());
    let node = Node::new(
        NodeConfig::new(runtime_id(), node_id()),
        host,
        consensus.clone(),
        Arc::new(StaticPeers(vec!["peer-a".into(), "peer-b".into()])),
        builder,
        metrics.clone(),
    );

    let hook = RecordingHook::new();
    hook.init.fire();
    node.add_hooks(hook.clone());

    Harness {
        node,
        consensus,
        metrics,
        hook,
        block_tx,
        consensus_block_tx,
        event_tx,
        host_event_tx,
        shutdown_log,
        km_ready,
    }
}

async fn wait_for_label(hook: &RecordingHook, label: &str) {
    timeout(Duration::from_secs(5), async {
        loop {
            if hook.events.lock().iter().any(|l| l == label) {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {label}, saw {:?}", hook.labels()));
}

#[tokio::test]
async fn test_first_block_forces_epoch_transition() {
    let h = harness(false);
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:0").await;

    assert_eq!(
        h.hook.labels(),
        vec!["new_block_early:0", "epoch_transition", "new_block:0"]
    );
    assert_eq!(
        h.metrics.get_counter("worker_processed_block_count"),
        Some(1)
    );
    assert_eq!(
        h.metrics.get_counter("worker_epoch_transition_count"),
        Some(1)
    );
    assert_eq!(h.metrics.get_gauge("worker_epoch_number"), Some(5));
    assert!(h.node.initialized().is_fired());

    let status = h.node.status().await;
    assert_eq!(status.latest_round, 0);
    assert_eq!(status.latest_height, 100);
    assert!(status.executor_roles.has(Role::Worker));
    assert!(status.is_transaction_scheduler);
    assert_eq!(status.peers, vec!["peer-a", "peer-b"]);

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_header_sequence_dispatches_in_order() {
    let h = harness(false);
    h.node.start().unwrap();

    for b in [
        block(0, HeaderType::Normal),
        block(1, HeaderType::Normal),
        block(2, HeaderType::EpochTransition),
        block(3, HeaderType::Suspended),
    ] {
        h.block_tx.send(b).await.unwrap();
    }
    wait_for_label(&h.hook, "new_block:3").await;

    let transitions: Vec<String> = h
        .hook
        .labels()
        .into_iter()
        .filter(|l| !l.starts_with("new_block"))
        .collect();
    assert_eq!(
        transitions,
        vec![
            "epoch_transition", // forced on the first block
            "round_transition",
            "epoch_transition",
            "suspend",
        ]
    );

    // Suspension hides committee roles until the next transition.
    let status = h.node.status().await;
    assert!(status.executor_roles.is_empty());
    assert!(!status.is_transaction_scheduler);

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_unknown_header_type_skips_processing() {
    let h = harness(false);
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:0").await;

    h.block_tx
        .send(block(1, HeaderType::Unknown(9)))
        .await
        .unwrap();
    // The early event fires before header dispatch, so its presence
    // proves the block reached the handler.
    wait_for_label(&h.hook, "new_block_early:1").await;

    let status = h.node.status().await;
    assert_eq!(status.latest_round, 1);
    assert!(!h.hook.labels().contains(&"new_block:1".to_string()));
    assert_eq!(
        h.metrics.get_counter("worker_processed_block_count"),
        Some(2)
    );

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_light_block_failure_drops_update() {
    let h = harness(false);
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:0").await;

    h.consensus.fail_light_blocks.store(true, Ordering::SeqCst);
    h.block_tx
        .send(block(1, HeaderType::Normal))
        .await
        .unwrap();

    // A later block proves the failed one was fully skipped.
    h.consensus.fail_light_blocks.store(false, Ordering::SeqCst);
    h.block_tx
        .send(block(2, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:2").await;

    let labels = h.hook.labels();
    assert!(!labels.contains(&"new_block_early:1".to_string()));
    assert!(!labels.contains(&"new_block:1".to_string()));

    let status = h.node.status().await;
    assert_eq!(status.latest_round, 2);

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_missing_runtime_retains_descriptor() {
    let h = harness(false);
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:0").await;

    // The registry no longer knows the runtime; the epoch transition
    // must still complete against the retained descriptor.
    *h.consensus.descriptor_mode.lock() = DescriptorMode::NoSuchRuntime;
    h.consensus.epoch.store(6, Ordering::SeqCst);
    h.block_tx
        .send(block(1, HeaderType::EpochTransition))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:1").await;

    assert_eq!(h.metrics.get_gauge("worker_epoch_number"), Some(6));
    assert_eq!(
        h.metrics.get_counter("worker_epoch_transition_count"),
        Some(2)
    );

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_consensus_height_tracked_separately() {
    let h = harness(false);
    h.node.start().unwrap();

    h.consensus_block_tx
        .send(ConsensusLightBlock {
            height: 512,
            meta: Bytes::new(),
        })
        .await
        .unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:0").await;

    // Consensus height advances independently of runtime rounds; the
    // block-derived status still reports the runtime block's height.
    let status = h.node.status().await;
    assert_eq!(status.latest_height, 100);

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_runtime_and_host_events_dispatch() {
    let h = harness(false);
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:0").await;

    h.event_tx
        .send(RuntimeEvent {
            runtime_id: runtime_id(),
            round: 0,
            kind: RuntimeEventKind::Finalized,
        })
        .await
        .unwrap();
    wait_for_label(&h.hook, "runtime_event:0").await;
    assert_eq!(
        h.metrics.get_counter("worker_processed_event_count"),
        Some(1)
    );

    h.host_event_tx.send(HostEvent::Started).await.unwrap();
    timeout(Duration::from_secs(5), async {
        loop {
            if !h.hook.host_events.lock().is_empty() {
                return;
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("timed out waiting for host event");
    assert_eq!(h.hook.host_events.lock()[0], HostEvent::Started);

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_waits_for_in_flight_block() {
    let h = harness(false);
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:0").await;

    *h.consensus.light_block_delay.lock() = Some(Duration::from_millis(200));
    h.block_tx
        .send(block(1, HeaderType::Normal))
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;

    // The state lock is held across the slow light block fetch, so a
    // status probe cannot observe the half-applied update.
    let probe = timeout(Duration::from_millis(50), h.node.status()).await;
    assert!(probe.is_err());

    wait_for_label(&h.hook, "new_block:1").await;
    let status = h.node.status().await;
    assert_eq!(status.latest_round, 1);

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_is_idempotent_and_quits_once() {
    let h = harness(false);
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    wait_for_label(&h.hook, "new_block:0").await;

    let node = h.node.clone();
    let stoppers: Vec<_> = (0..4)
        .map(|_| {
            let node = node.clone();
            tokio::spawn(async move { node.stop() })
        })
        .collect();
    for stopper in stoppers {
        stopper.await.unwrap();
    }
    h.node.stop();

    h.node.quit().wait().await;
    assert!(h.node.quit().is_fired());

    // Hosted runtime teardown happens in reverse order of startup.
    assert_eq!(*h.shutdown_log.lock(), vec!["notifier", "hosted"]);
}

#[tokio::test]
async fn test_key_manager_gates_block_processing() {
    let h = harness(true);
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;
    assert!(!h.node.initialized().is_fired());
    assert!(h.hook.labels().is_empty());

    h.km_ready.fire();
    wait_for_label(&h.hook, "new_block:0").await;
    assert!(h.node.initialized().is_fired());

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_stop_does_not_cancel_key_manager_wait() {
    let h = harness(true);
    h.node.start().unwrap();

    h.node.stop();
    sleep(Duration::from_millis(50)).await;
    // The key manager wait is only bounded by the node lifetime, so a
    // stop request alone does not unwind the worker.
    assert!(!h.node.quit().is_fired());

    h.km_ready.fire();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_hook_readiness_gates_block_processing() {
    let h = harness(false);
    let slow = RecordingHook::new();
    h.node.add_hooks(slow.clone());
    h.node.start().unwrap();

    h.block_tx
        .send(block(0, HeaderType::Normal))
        .await
        .unwrap();
    sleep(Duration::from_millis(50)).await;

    // The node itself initializes on the first block, but holds block
    // processing until every hook reports ready.
    assert!(h.node.initialized().is_fired());
    assert!(h.hook.labels().is_empty());

    slow.init.fire();
    wait_for_label(&h.hook, "new_block:0").await;
    assert_eq!(slow.labels(), h.hook.labels());

    h.node.stop();
    h.node.quit().wait().await;
}

#[tokio::test]
async fn test_peer_transactions_flow_into_scheduler() {
    let h = harness(false);
    h.node.start().unwrap();

    let tx = CheckedTransaction::new(Bytes::from_static(b"transfer"), 3, BTreeMap::new());
    h.node.handle_peer_tx(tx.clone()).unwrap();
    // Resubmission from another peer is benign.
    h.node.handle_peer_tx(tx.clone()).unwrap();

    let scheduler = h.node.scheduler();
    assert_eq!(scheduler.unscheduled_size(), 1);
    assert!(scheduler.is_queued(&tx.hash()));

    let batch = scheduler.get_batch(true);
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].hash(), tx.hash());

    h.node.stop();
    h.node.quit().wait().await;
}
