use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use simon::code::SimulationCode;
use simon::tree::TaskNode;
use simon::types::{Probe, TaskStatus};

#[derive(Debug, Default)]
struct FakeState {
    probes: HashMap<PathBuf, Probe>,
    failing_probes: HashSet<PathBuf>,
    failing_actions: HashSet<String>,
    calls: Vec<(String, String)>,
}

/// A simulation code that:
/// - answers probes from a per-directory script (NEW when unscripted)
/// - records every action as `(directory name, action)`
/// - turns `start`/`restart` into RUNNING and `kill` on a STALLED
///   directory into STOPPED, so the next probe sees the effect.
///
/// Clones share state, so a test keeps one handle and registers another.
#[derive(Debug, Clone)]
pub struct FakeCode {
    name: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeCode {
    pub const NAME: &'static str = "fake";

    pub fn new() -> Self {
        Self::named(Self::NAME)
    }

    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            state: Arc::default(),
        }
    }

    pub fn set_probe(&self, dir: impl AsRef<Path>, status: TaskStatus, progress: f64, target: f64) {
        self.lock()
            .probes
            .insert(dir.as_ref().to_path_buf(), Probe::new(status, progress, target));
    }

    pub fn set_status(&self, dir: impl AsRef<Path>, status: TaskStatus) {
        let mut state = self.lock();
        let probe = state
            .probes
            .entry(dir.as_ref().to_path_buf())
            .or_insert_with(|| Probe::new(TaskStatus::New, 0.0, 0.0));
        probe.status = status;
    }

    pub fn fail_probe(&self, dir: impl AsRef<Path>) {
        self.lock().failing_probes.insert(dir.as_ref().to_path_buf());
    }

    pub fn heal_probe(&self, dir: impl AsRef<Path>) {
        self.lock().failing_probes.remove(dir.as_ref());
    }

    /// Make every call of `action` (e.g. "start") fail.
    pub fn fail_action(&self, action: &str) {
        self.lock().failing_actions.insert(action.to_string());
    }

    /// All recorded `(directory name, action)` calls, in order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.lock().calls.clone()
    }

    /// Directory names that received `action`, in order.
    pub fn calls_for(&self, action: &str) -> Vec<String> {
        self.lock()
            .calls
            .iter()
            .filter(|(_, a)| a == action)
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, task: &TaskNode, action: &str) -> Result<()> {
        let mut state = self.lock();
        state.calls.push((task.name.clone(), action.to_string()));
        if state.failing_actions.contains(action) {
            return Err(anyhow!("fake {action} failure in {}", task.dir.display()));
        }
        Ok(())
    }
}

impl Default for FakeCode {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationCode for FakeCode {
    fn name(&self) -> &str {
        &self.name
    }

    fn probe_status(&self, task: &TaskNode) -> Result<Probe> {
        let state = self.lock();
        if state.failing_probes.contains(&task.dir) {
            return Err(anyhow!("fake probe failure in {}", task.dir.display()));
        }
        Ok(state
            .probes
            .get(&task.dir)
            .copied()
            .unwrap_or_else(|| Probe::new(TaskStatus::New, 0.0, 0.0)))
    }

    fn start(&self, task: &TaskNode) -> Result<()> {
        self.record(task, "start")?;
        self.set_status(&task.dir, TaskStatus::Running);
        Ok(())
    }

    fn restart(&self, task: &TaskNode) -> Result<()> {
        self.record(task, "restart")?;
        self.set_status(&task.dir, TaskStatus::Running);
        Ok(())
    }

    fn stop(&self, task: &TaskNode) -> Result<()> {
        self.record(task, "stop")
    }

    fn kill(&self, task: &TaskNode) -> Result<()> {
        self.record(task, "kill")?;
        let mut state = self.lock();
        if let Some(probe) = state.probes.get_mut(&task.dir) {
            if probe.status == TaskStatus::Stalled {
                probe.status = TaskStatus::Stopped;
            }
        }
        Ok(())
    }

    fn backup_checkpoint(&self, task: &TaskNode) -> Result<()> {
        self.record(task, "backup")
    }

    fn delete(&self, task: &TaskNode) -> Result<()> {
        self.record(task, "delete")
    }

    fn collect_recent_output(&self, task: &TaskNode) -> Result<String> {
        self.record(task, "check")?;
        Ok(format!("t = {}", task.progress))
    }

    fn run_shell_command(&self, task: &TaskNode, command: &str) -> Result<String> {
        self.record(task, "exec")?;
        Ok(format!("{}: {command}", task.name))
    }
}
