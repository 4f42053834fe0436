// src/tree/node.rs

//! Task node: the per-directory record of one simulation attempt.

use std::path::PathBuf;

use crate::config::SimulationConfig;
use crate::types::{Probe, TaskId, TaskStatus, ROOT_ID};

/// One simulation directory (or the synthetic root) in the forest.
///
/// All links are plain ids into the owning [`super::SimulationTree`].
#[derive(Debug, Clone)]
pub struct TaskNode {
    pub id: TaskId,
    pub name: String,
    pub dir: PathBuf,
    /// Node of the directory containing this one; `None` only for the root.
    pub parent_id: Option<TaskId>,
    /// Depth below the scan root (root = 0, top-level jobs = 1).
    pub level: usize,
    /// Effective status, including what was propagated from descendants.
    pub status: TaskStatus,
    /// Status reported by this directory's own probe, before propagation.
    pub own_status: TaskStatus,
    /// False if no probe of this directory has ever succeeded; such nodes
    /// are never scheduled automatically.
    pub status_known: bool,
    /// `t`: how far the simulation got.
    pub progress: f64,
    /// `t_max_extended`: where the simulation (or its best restart) ends.
    pub progress_target: f64,
    /// Most advanced resumable child, if any.
    pub restart_candidate: Option<TaskId>,
    pub niceness: i32,
    pub children: Vec<TaskId>,
    /// Parsed `simulation.toml`; `None` if missing or unreadable.
    pub config: Option<SimulationConfig>,
}

impl TaskNode {
    pub fn root(dir: impl Into<PathBuf>) -> Self {
        Self::new(ROOT_ID, "root".to_string(), dir.into(), None, 0)
    }

    pub fn new(
        id: TaskId,
        name: String,
        dir: PathBuf,
        parent_id: Option<TaskId>,
        level: usize,
    ) -> Self {
        Self {
            id,
            name,
            dir,
            parent_id,
            level,
            status: TaskStatus::New,
            own_status: TaskStatus::New,
            status_known: false,
            progress: 0.0,
            progress_target: 0.0,
            restart_candidate: None,
            niceness: 0,
            children: Vec::new(),
            config: None,
        }
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    /// Simulation code named by the marker file.
    pub fn code_name(&self) -> Option<&str> {
        self.config.as_ref().map(|c| c.code_name.as_str())
    }

    /// Overwrite status and progress counters with a fresh probe.
    pub fn apply_probe(&mut self, probe: Probe) {
        self.set_own_status(probe.status);
        self.progress = probe.progress;
        self.progress_target = probe.target;
    }

    /// Record a status observed for this directory itself.
    pub fn set_own_status(&mut self, status: TaskStatus) {
        self.status = status;
        self.own_status = status;
        self.status_known = true;
    }
}
