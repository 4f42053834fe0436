// src/tree/mod.rs

//! The simulation forest.
//!
//! - [`node`] holds the per-directory record.
//! - [`forest`] is the id-indexed arena owning all nodes of one pass.
//! - [`builder`] scans the filesystem and populates the arena.
//! - [`propagate`] pushes RUNNING/DONE up to ancestors.
//! - [`render`] prints the status overview.

pub mod builder;
pub mod forest;
pub mod node;
pub mod propagate;
pub mod render;

/// Presence of this file marks a simulation as failed.
pub const ERROR_MARKER: &str = "ERROR";

pub use builder::{compile_scan_pattern, TreeBuilder};
pub use forest::SimulationTree;
pub use node::TaskNode;
pub use propagate::{propagate_status, Propagation, MAX_PROPAGATION_PASSES};
