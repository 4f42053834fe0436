// src/code/mod.rs

//! Simulation-code capability layer.
//!
//! The core never knows how a particular simulation binary is started or how
//! its output is parsed. It talks to a [`SimulationCode`] picked by the
//! `code_name` in each directory's `simulation.toml`:
//!
//! - [`registry`] maps code names to implementations.
//! - [`shell`] is the built-in, command-driven implementation.
//! - [`process`] wraps pid files and signals.
//!
//! Tests register their own implementation that records calls instead of
//! spawning processes.

use std::fmt::Debug;

use anyhow::Result;

use crate::tree::TaskNode;
use crate::types::Probe;

pub mod process;
pub mod registry;
pub mod shell;

pub use registry::CodeRegistry;
pub use shell::ShellCode;

/// Operations one kind of simulation code supports.
///
/// Every action is fire-and-forget from the scheduler's point of view:
/// success or failure is logged and the next pass re-derives the state from
/// disk.
pub trait SimulationCode: Send + Sync + Debug {
    /// Name matched against `code_name` in `simulation.toml`.
    fn name(&self) -> &str;

    /// Derive status and progress from on-disk evidence.
    ///
    /// Must not fail on missing output files; an error means the status
    /// could not be determined at all.
    fn probe_status(&self, task: &TaskNode) -> Result<Probe>;

    fn start(&self, task: &TaskNode) -> Result<()>;

    /// Resume from the checkpoint of `task`, usually in a new nested
    /// restart directory.
    fn restart(&self, task: &TaskNode) -> Result<()>;

    /// Ask the simulation to stop in the way the code supports.
    fn stop(&self, task: &TaskNode) -> Result<()>;

    fn kill(&self, task: &TaskNode) -> Result<()>;

    fn backup_checkpoint(&self, task: &TaskNode) -> Result<()>;

    /// Remove the simulation directory with all its data.
    fn delete(&self, task: &TaskNode) -> Result<()>;

    /// Recent output of the simulation, for operators.
    fn collect_recent_output(&self, task: &TaskNode) -> Result<String>;

    /// Run an arbitrary shell command inside the simulation directory.
    fn run_shell_command(&self, task: &TaskNode, command: &str) -> Result<String>;
}
