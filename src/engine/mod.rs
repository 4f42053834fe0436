// src/engine/mod.rs

//! Orchestration engine for SiMon.
//!
//! This module ties together:
//! - the [`Monitor`] context object that owns one root directory and runs
//!   tree-build → propagate → schedule passes against it
//! - the auto-scheduler dispatch policy ([`scheduler`])
//! - the async daemon loop that triggers passes periodically ([`runtime`])
//!
//! Nothing here survives between passes except configuration and a
//! fallback status cache; all other state is re-derived from disk.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::types::TaskId;

/// A per-node operation, as issued by the scheduler or an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Start,
    Restart,
    /// Collect recent output.
    Check,
    Stop,
    Delete,
    Kill,
    Backup,
    /// Run a shell command in the simulation directory.
    Exec(String),
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Restart => "restart",
            Action::Check => "check",
            Action::Stop => "stop",
            Action::Delete => "delete",
            Action::Kill => "kill",
            Action::Backup => "backup",
            Action::Exec(_) => "exec",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Exec(cmd) => write!(f, "exec({cmd})"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for Action {
    type Err = String;

    /// Parses everything but `exec`, which needs a command.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" | "n" => Ok(Action::Start),
            "restart" | "r" => Ok(Action::Restart),
            "check" | "c" => Ok(Action::Check),
            "stop" | "t" => Ok(Action::Stop),
            "delete" | "d" => Ok(Action::Delete),
            "kill" | "k" => Ok(Action::Kill),
            "backup" | "b" => Ok(Action::Backup),
            other => Err(format!("invalid action: {other}")),
        }
    }
}

/// One action issued during a scheduling pass.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub id: TaskId,
    pub name: String,
    pub dir: PathBuf,
    pub action: Action,
    /// `None` on success, the error message otherwise.
    pub error: Option<String>,
}

impl DispatchRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Structured result of [`Monitor::run_one_cycle`].
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub dispatched: Vec<DispatchRecord>,
    /// Running-slot counter at the end of the pass.
    pub concurrent_jobs: usize,
    /// Extra tree rebuilds caused by stalled simulations.
    pub rebuilds: usize,
}

impl CycleReport {
    /// Actions issued on nodes with the given directory name.
    pub fn actions_for(&self, name: &str) -> Vec<&Action> {
        self.dispatched
            .iter()
            .filter(|r| r.name == name)
            .map(|r| &r.action)
            .collect()
    }

    /// Number of start/restart dispatches.
    pub fn admissions(&self) -> usize {
        self.dispatched
            .iter()
            .filter(|r| matches!(r.action, Action::Start | Action::Restart))
            .count()
    }
}

/// Events flowing into the daemon runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Time for a scheduling pass.
    Tick,
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod runtime;
pub mod scheduler;

pub use core::Monitor;
pub use runtime::Runtime;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actions_parse_from_names_and_menu_letters() {
        assert_eq!("restart".parse::<Action>(), Ok(Action::Restart));
        assert_eq!("K".parse::<Action>(), Ok(Action::Kill));
        assert!("exec".parse::<Action>().is_err());
        assert_eq!(Action::Exec("ls".into()).to_string(), "exec(ls)");
    }
}
