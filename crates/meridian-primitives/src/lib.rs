//! # meridian-primitives
//!
//! Primitive types shared by the Meridian committee node:
//! - 32-byte content hash with keccak256 digest
//! - Runtime identifier
//!
//! All higher-level crates build on these types.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;
mod runtime_id;

pub use hash::{Hash, HashError};
pub use runtime_id::RuntimeId;
