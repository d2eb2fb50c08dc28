//! Priority transaction pool implementation

use crate::error::{PoolError, PoolResult};
use dashmap::DashMap;
use meridian_primitives::Hash;
use meridian_types::{BlockInfo, CheckedTransaction, Weight};
use parking_lot::{Mutex, RwLock};
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

/// What happens to queued transactions that no longer satisfy the
/// limits after a configuration swap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EvictionPolicy {
    /// Drop nonconforming transactions and trim the queue to the new
    /// maximum size (default).
    #[default]
    Evict,
    /// Keep everything already queued; apply the new limits to future
    /// admissions only.
    Grandfather,
}

/// Pool configuration, hot-swappable via `update_config`
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoolConfig {
    /// Maximum number of queued transactions
    pub max_pool_size: u64,
    /// Per-dimension weight limits, bounding both a single transaction
    /// and batch formation
    pub weight_limits: BTreeMap<Weight, u64>,
    /// `get_batch(force=false)` returns an empty batch while the queue
    /// is below this size
    pub min_batch_size: u64,
    /// Policy applied to already-queued transactions on config swap
    pub eviction_policy: EvictionPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let mut weight_limits = BTreeMap::new();
        weight_limits.insert(Weight::Count, 1_000);
        weight_limits.insert(Weight::SizeBytes, 16 * 1024 * 1024);
        Self {
            max_pool_size: 10_000,
            weight_limits,
            min_batch_size: 1,
            eviction_policy: EvictionPolicy::Evict,
        }
    }
}

/// Queue position: highest priority first, arrival order within a
/// priority class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct QueueKey {
    priority: Reverse<u64>,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    queue: BTreeMap<QueueKey, CheckedTransaction>,
    next_seq: u64,
}

/// Deduplicating, capacity- and weight-bounded priority pool.
///
/// The pool owns its internal synchronization; callers never need an
/// external lock.
pub struct PriorityPool {
    config: RwLock<PoolConfig>,
    inner: Mutex<Inner>,
    by_hash: DashMap<Hash, QueueKey>,
    running: AtomicBool,
}

impl PriorityPool {
    /// Create a new pool with the given configuration
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config: RwLock::new(config),
            inner: Mutex::new(Inner::default()),
            by_hash: DashMap::new(),
            running: AtomicBool::new(false),
        }
    }

    /// Start the pool. Fails if it is already running.
    pub fn start(&self) -> PoolResult<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(PoolError::AlreadyRunning);
        }
        tracing::info!("starting transaction pool");
        Ok(())
    }

    /// Stop the pool. Idempotent; only the first call has effect.
    pub fn stop(&self) {
        if self
            .running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::info!("stopping transaction pool");
        }
    }

    /// Whether the pool has been started and not yet stopped
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Add a transaction to the queue.
    ///
    /// Fails with `AlreadyExists` on a duplicate identifier, `Full`
    /// when the pool is at capacity, and `WeightLimitReached` when the
    /// transaction alone exceeds any configured weight limit (such a
    /// transaction could never be scheduled).
    pub fn add(&self, tx: CheckedTransaction) -> PoolResult<()> {
        let hash = tx.hash();
        if self.by_hash.contains_key(&hash) {
            return Err(PoolError::AlreadyExists(hash));
        }

        let (max_pool_size, weight_limits) = {
            let cfg = self.config.read();
            (cfg.max_pool_size, cfg.weight_limits.clone())
        };

        let mut inner = self.inner.lock();

        // Re-check under the queue lock; the lock-free check above is
        // only a fast path.
        if self.by_hash.contains_key(&hash) {
            return Err(PoolError::AlreadyExists(hash));
        }

        let size = inner.queue.len() as u64;
        if size >= max_pool_size {
            return Err(PoolError::Full {
                size,
                max_size: max_pool_size,
            });
        }

        for (weight, limit) in &weight_limits {
            let declared = tx.weight(weight);
            if declared > *limit {
                return Err(PoolError::WeightLimitReached {
                    weight: weight.clone(),
                    declared,
                    limit: *limit,
                });
            }
        }

        let key = QueueKey {
            priority: Reverse(tx.priority()),
            seq: inner.next_seq,
        };
        inner.next_seq += 1;
        self.by_hash.insert(hash, key);
        inner.queue.insert(key, tx);

        Ok(())
    }

    /// Remove a batch of transactions by identifier. Unknown
    /// identifiers are silently ignored.
    pub fn remove_batch(&self, ids: &[Hash]) {
        let mut inner = self.inner.lock();
        for id in ids {
            if let Some((_, key)) = self.by_hash.remove(id) {
                inner.queue.remove(&key);
            }
        }
    }

    /// Return the best available batch respecting the configured
    /// weight limits. When `force` is false and the queue is below the
    /// configured minimum batch size, an empty batch is returned.
    ///
    /// Transactions are not removed; call `remove_batch` once the
    /// batch has been scheduled.
    pub fn get_batch(&self, force: bool) -> Vec<CheckedTransaction> {
        let (weight_limits, min_batch_size) = {
            let cfg = self.config.read();
            (cfg.weight_limits.clone(), cfg.min_batch_size)
        };

        let inner = self.inner.lock();
        if !force && (inner.queue.len() as u64) < min_batch_size {
            return Vec::new();
        }

        let mut batch = Vec::new();
        let mut batch_weights: HashMap<&Weight, u64> = HashMap::new();
        for tx in inner.queue.values() {
            let fits = weight_limits.iter().all(|(weight, limit)| {
                batch_weights.get(weight).copied().unwrap_or(0) + tx.weight(weight) <= *limit
            });
            if !fits {
                continue;
            }
            for weight in weight_limits.keys() {
                *batch_weights.entry(weight).or_insert(0) += tx.weight(weight);
            }
            batch.push(tx.clone());
        }
        batch
    }

    /// Resolve a set of identifiers to known transactions. Returns one
    /// entry per input identifier (`None` for unknown) plus a map from
    /// unknown identifier to its index in the input, for reconciling a
    /// batch referenced only by identifier.
    pub fn get_known_batch(
        &self,
        ids: &[Hash],
    ) -> (Vec<Option<CheckedTransaction>>, HashMap<Hash, usize>) {
        let inner = self.inner.lock();
        let mut batch = Vec::with_capacity(ids.len());
        let mut unknown = HashMap::new();
        for (idx, id) in ids.iter().enumerate() {
            let tx = self
                .by_hash
                .get(id)
                .and_then(|key| inner.queue.get(&*key).cloned());
            if tx.is_none() {
                unknown.insert(*id, idx);
            }
            batch.push(tx);
        }
        (batch, unknown)
    }

    /// Snapshot of up to `limit` queued transactions in priority
    /// order. A limit of 0 returns everything.
    pub fn get_transactions(&self, limit: usize) -> Vec<CheckedTransaction> {
        let inner = self.inner.lock();
        let limit = if limit == 0 { usize::MAX } else { limit };
        inner.queue.values().take(limit).cloned().collect()
    }

    /// Number of queued transactions
    pub fn size(&self) -> u64 {
        self.inner.lock().queue.len() as u64
    }

    /// Whether a transaction with the given identifier is queued
    pub fn is_queued(&self, id: &Hash) -> bool {
        self.by_hash.contains_key(id)
    }

    /// Replace the pool configuration. Under `EvictionPolicy::Evict`
    /// (the default), queued transactions violating the new
    /// per-transaction weight limits are dropped, then the lowest
    /// priority transactions are dropped until the new maximum pool
    /// size holds.
    pub fn update_config(&self, config: PoolConfig) {
        let policy = config.eviction_policy;
        let max_pool_size = config.max_pool_size;
        let weight_limits = config.weight_limits.clone();
        *self.config.write() = config;

        if policy == EvictionPolicy::Grandfather {
            return;
        }

        let mut inner = self.inner.lock();
        let nonconforming: Vec<QueueKey> = inner
            .queue
            .iter()
            .filter(|(_, tx)| {
                weight_limits
                    .iter()
                    .any(|(weight, limit)| tx.weight(weight) > *limit)
            })
            .map(|(key, _)| *key)
            .collect();
        let mut evicted = nonconforming.len();
        for key in nonconforming {
            if let Some(tx) = inner.queue.remove(&key) {
                self.by_hash.remove(&tx.hash());
            }
        }
        while inner.queue.len() as u64 > max_pool_size {
            let Some((key, _)) = inner.queue.iter().next_back() else {
                break;
            };
            let key = *key;
            if let Some(tx) = inner.queue.remove(&key) {
                self.by_hash.remove(&tx.hash());
            }
            evicted += 1;
        }
        if evicted > 0 {
            tracing::info!(evicted, "evicted transactions on config update");
        }
    }

    /// Re-validate the queue against a newly observed block, dropping
    /// transactions whose validity window has elapsed.
    pub fn process_block(&self, info: &BlockInfo) -> PoolResult<()> {
        let mut inner = self.inner.lock();
        let expired: Vec<QueueKey> = inner
            .queue
            .iter()
            .filter(|(_, tx)| tx.is_expired(info.epoch))
            .map(|(key, _)| *key)
            .collect();
        if !expired.is_empty() {
            tracing::debug!(
                count = expired.len(),
                round = info.runtime_block.round(),
                epoch = info.epoch,
                "dropping expired transactions"
            );
        }
        for key in expired {
            if let Some(tx) = inner.queue.remove(&key) {
                self.by_hash.remove(&tx.hash());
            }
        }
        Ok(())
    }

    /// Empty the queue
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.queue.clear();
        self.by_hash.clear();
    }
}
