// src/types.rs

use std::fmt;
use std::str::FromStr;

/// Identifier of a simulation node within one scheduling pass.
///
/// Ids are assigned in discovery order and are only stable for as long as
/// the on-disk forest does not change. `0` is always the synthetic root.
pub type TaskId = usize;

/// Id of the synthetic root node representing the scan root itself.
pub const ROOT_ID: TaskId = 0;

/// Runtime status of a simulation directory, derived from on-disk evidence.
///
/// - `New`: nothing suggests the simulation has ever run.
/// - `Running`: a live process was detected.
/// - `Stopped`: the process ended but the job is incomplete and resumable.
/// - `Stalled`: the process is alive but no longer makes progress.
/// - `Error`: an explicit failure marker is present.
/// - `Done`: the completion criterion is met.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskStatus {
    #[default]
    New,
    Running,
    Stopped,
    Stalled,
    Error,
    Done,
}

impl TaskStatus {
    /// Statuses that are pushed from a descendant onto its ancestors.
    pub fn propagates(self) -> bool {
        matches!(self, TaskStatus::Running | TaskStatus::Done)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::New => "NEW",
            TaskStatus::Running => "RUN",
            TaskStatus::Stopped => "STOP",
            TaskStatus::Stalled => "STALL",
            TaskStatus::Error => "ERROR",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(TaskStatus::New),
            "run" | "running" => Ok(TaskStatus::Running),
            "stop" | "stopped" => Ok(TaskStatus::Stopped),
            "stall" | "stalled" => Ok(TaskStatus::Stalled),
            "error" => Ok(TaskStatus::Error),
            "done" => Ok(TaskStatus::Done),
            other => Err(format!("invalid task status: {other}")),
        }
    }
}

/// Result of probing one simulation directory.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Probe {
    pub status: TaskStatus,
    /// Simulation-defined progress counter (`t`).
    pub progress: f64,
    /// Progress at which the simulation is complete (`t_max_extended`).
    pub target: f64,
}

impl Probe {
    pub fn new(status: TaskStatus, progress: f64, target: f64) -> Self {
        Self {
            status,
            progress,
            target,
        }
    }
}
