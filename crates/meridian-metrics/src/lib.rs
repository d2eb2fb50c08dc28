//! # meridian-metrics
//!
//! Observability sink for Meridian components.
//!
//! A [`Metrics`] instance is created by the composition root and
//! passed to each component at construction. Nothing here is
//! process-global: registering the sink exactly once per process is
//! the composition root's contract, not ambient state.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod collector;

pub use collector::Metrics;
