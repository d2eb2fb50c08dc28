//! # meridian-scheduler
//!
//! Batching transaction scheduler facade for Meridian.
//!
//! Exposes the transaction pool under one fixed capability set
//! ([`Scheduler`]) so alternative pool strategies are swappable
//! without touching the committee node. The facade normalizes the
//! pool's duplicate-submission condition into a plain success so
//! callers cannot mistake benign resubmission for a failure.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod simple;

pub use simple::{Scheduler, SimpleScheduler, SCHEDULER_NAME};
