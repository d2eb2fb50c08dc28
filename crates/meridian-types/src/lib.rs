//! # meridian-types
//!
//! Core data model for the Meridian committee node:
//! - Runtime blocks and header types
//! - Consensus light blocks
//! - Runtime registration descriptors
//! - Epoch time
//! - Committees and executor roles
//! - Checked transactions with weight vectors
//!
//! These types are immutable value objects; all coordination logic
//! lives in `meridian-committee` and `meridian-txpool`.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod block;
mod committee;
mod descriptor;
mod epoch;
mod event;
mod transaction;

pub use block::{BlockHeader, ConsensusLightBlock, HeaderType, RuntimeBlock};
pub use committee::{Committee, CommitteeMember, Role, RoleMask};
pub use descriptor::{ExecutorParameters, RuntimeDescriptor, TxnSchedulerParameters};
pub use epoch::{EpochTime, EPOCH_INVALID};
pub use event::{HostEvent, RuntimeEvent, RuntimeEventKind};
pub use transaction::{BlockInfo, CheckedTransaction, Weight};
