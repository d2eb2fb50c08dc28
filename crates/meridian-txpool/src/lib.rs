//! # meridian-txpool
//!
//! Transaction admission and batch scheduling pool for Meridian.
//!
//! This crate provides:
//! - Content-hash deduplication
//! - Pool size and per-dimension weight limits
//! - Priority ordering with arrival-order tie breaking
//! - Weight-bounded batch formation
//! - Revalidation against newly observed blocks
//!
//! ## Architecture
//!
//! ```text
//! +---------------------+
//! |    PriorityPool     |
//! +---------------------+
//!           |
//! +---------+-----------+
//! | (priority, arrival) |  <- Ordered admission queue
//! +---------+-----------+
//!           |
//! +---------------------+
//! |    By Hash Index    |  <- Dedup / fast lookup by tx hash
//! +---------------------+
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use meridian_txpool::{PriorityPool, PoolConfig};
//!
//! let pool = PriorityPool::new(PoolConfig::default());
//! pool.add(tx)?;
//! let batch = pool.get_batch(true);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod pool;

pub use error::{PoolError, PoolResult};
pub use pool::{EvictionPolicy, PoolConfig, PriorityPool};
