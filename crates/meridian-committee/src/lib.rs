//! # meridian-committee
//!
//! Per-runtime committee coordination node.
//!
//! The [`Node`] turns independently-progressing event streams
//! (consensus blocks, runtime blocks, runtime events, hosted-runtime
//! events) into a single lock-protected view of the current epoch,
//! block, and descriptor. It gates startup on dependent subsystems
//! (consensus sync, runtime registration, optional key manager), fans
//! state transitions out to registered [`NodeHooks`], and drives the
//! embedded transaction pool and scheduler facade.
//!
//! External collaborators (consensus backend, runtime host, key
//! manager, peer transport) are consumed through the capability
//! traits in [`traits`]; the node never talks to a concrete backend.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod group;
mod hooks;
mod latch;
mod node;
pub mod traits;

pub use config::NodeConfig;
pub use error::{NodeError, NodeResult};
pub use group::{EpochSnapshot, Group, GroupError};
pub use hooks::{NodeEvent, NodeHooks};
pub use latch::Latch;
pub use node::{
    Node, Status, METRIC_EPOCH_NUMBER, METRIC_EPOCH_TRANSITIONS, METRIC_FAILED_ROUNDS,
    METRIC_PROCESSED_BLOCKS, METRIC_PROCESSED_EVENTS,
};
