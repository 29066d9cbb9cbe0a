// src/dag/mod.rs

//! Per-job task graphs and dependency resolution.
//!
//! - [`graph`] holds the immutable dependency edges of one job, keyed by
//!   `TaskId`.
//! - [`resolver`] tracks which tasks are eligible, running or held back by a
//!   pause, and recomputes eligibility as tasks terminate.

pub mod graph;
pub mod resolver;

pub use graph::TaskGraph;
pub use resolver::DependencyResolver;
