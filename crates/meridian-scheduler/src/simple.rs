//! Simple batching scheduler

use meridian_primitives::Hash;
use meridian_types::{CheckedTransaction, Weight};
use meridian_txpool::{PoolConfig, PoolError, PoolResult, PriorityPool};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Name of the simple scheduler
pub const SCHEDULER_NAME: &str = "simple";

/// Uniform capability set over a transaction pool.
///
/// Queueing, removal, batch retrieval, and parameter updates all go
/// through this trait; the committee node never touches a pool
/// implementation directly on the block-proposal path.
pub trait Scheduler: Send + Sync {
    /// Scheduler algorithm name
    fn name(&self) -> &'static str;

    /// Queue a transaction for scheduling.
    ///
    /// A duplicate submission is reported as success: resubmitting an
    /// already-queued transaction is benign and must not look like an
    /// error to the submitter.
    fn queue_tx(&self, tx: CheckedTransaction) -> PoolResult<()>;

    /// Remove a batch of transactions by identifier
    fn remove_tx_batch(&self, ids: &[Hash]);

    /// Get the best available batch
    fn get_batch(&self, force: bool) -> Vec<CheckedTransaction>;

    /// Resolve identifiers to known transactions
    fn get_known_batch(
        &self,
        ids: &[Hash],
    ) -> (Vec<Option<CheckedTransaction>>, HashMap<Hash, usize>);

    /// Snapshot of up to `limit` queued transactions (0 = all)
    fn get_transactions(&self, limit: usize) -> Vec<CheckedTransaction>;

    /// Number of transactions awaiting scheduling
    fn unscheduled_size(&self) -> u64;

    /// Whether the identifier is queued
    fn is_queued(&self, id: &Hash) -> bool;

    /// Swap the batch weight limits, keeping the rest of the pool
    /// configuration as constructed
    fn update_parameters(&self, weight_limits: BTreeMap<Weight, u64>);

    /// Empty the queue
    fn clear(&self);
}

/// Simple batching scheduler over a [`PriorityPool`]
pub struct SimpleScheduler {
    pool: Arc<PriorityPool>,
    base: PoolConfig,
}

impl SimpleScheduler {
    /// Create a scheduler owning a fresh pool with the given
    /// configuration
    pub fn new(config: PoolConfig) -> Self {
        Self {
            pool: Arc::new(PriorityPool::new(config.clone())),
            base: config,
        }
    }

    /// Create a scheduler over an existing pool, remembering `config`
    /// as the base for parameter updates
    pub fn with_pool(pool: Arc<PriorityPool>, config: PoolConfig) -> Self {
        Self { pool, base: config }
    }

    /// The underlying pool, shared with the component driving its
    /// lifecycle and block updates
    pub fn pool(&self) -> &Arc<PriorityPool> {
        &self.pool
    }
}

impl Scheduler for SimpleScheduler {
    fn name(&self) -> &'static str {
        SCHEDULER_NAME
    }

    fn queue_tx(&self, tx: CheckedTransaction) -> PoolResult<()> {
        match self.pool.add(tx) {
            Ok(()) => Ok(()),
            Err(PoolError::AlreadyExists(hash)) => {
                tracing::warn!(%hash, "ignoring duplicate transaction");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn remove_tx_batch(&self, ids: &[Hash]) {
        self.pool.remove_batch(ids);
    }

    fn get_batch(&self, force: bool) -> Vec<CheckedTransaction> {
        self.pool.get_batch(force)
    }

    fn get_known_batch(
        &self,
        ids: &[Hash],
    ) -> (Vec<Option<CheckedTransaction>>, HashMap<Hash, usize>) {
        self.pool.get_known_batch(ids)
    }

    fn get_transactions(&self, limit: usize) -> Vec<CheckedTransaction> {
        self.pool.get_transactions(limit)
    }

    fn unscheduled_size(&self) -> u64 {
        self.pool.size()
    }

    fn is_queued(&self, id: &Hash) -> bool {
        self.pool.is_queued(id)
    }

    fn update_parameters(&self, weight_limits: BTreeMap<Weight, u64>) {
        self.pool.update_config(PoolConfig {
            max_pool_size: self.base.max_pool_size,
            weight_limits,
            min_batch_size: self.base.min_batch_size,
            eviction_policy: self.base.eviction_policy,
        });
    }

    fn clear(&self) {
        self.pool.clear();
    }
}
