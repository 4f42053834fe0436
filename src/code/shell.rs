// src/code/shell.rs

//! Built-in `shell` simulation code.
//!
//! Drives any simulation binary through shell commands configured in the
//! directory's `simulation.toml`:
//!
//! ```toml
//! [simulation]
//! code_name = "shell"
//! start_cmd = "./nbody ic.dat"
//! restart_cmd = "./nbody --resume restart.dat"
//! output_file = "output.txt"
//! progress_pattern = '^\s*t\s*=\s*([-+0-9.eE]+)'
//! t_max = 100
//! stall_timeout = 3600
//! checkpoint_files = ["restart.dat"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{bail, Context, Result};
use nix::sys::signal::Signal;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::code::process::{self, PID_FILE};
use crate::code::SimulationCode;
use crate::config::SIMULATION_CONFIG_FILE;
use crate::tree::{TaskNode, ERROR_MARKER};
use crate::types::{Probe, TaskStatus};

/// Lines returned by [`SimulationCode::collect_recent_output`].
const RECENT_OUTPUT_LINES: usize = 10;

/// `shell`-specific keys of `[simulation]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellParams {
    pub start_cmd: String,

    /// Defaults to `start_cmd`.
    #[serde(default)]
    pub restart_cmd: Option<String>,

    /// If unset, `stop` sends SIGTERM to the recorded pid.
    #[serde(default)]
    pub stop_cmd: Option<String>,

    #[serde(default = "default_output_file")]
    pub output_file: String,

    #[serde(default = "default_error_file")]
    pub error_file: String,

    /// Regex whose first capture group is the current progress `t`.
    #[serde(default = "default_progress_pattern")]
    pub progress_pattern: String,

    /// Progress at which the simulation is complete; `0` disables.
    #[serde(default)]
    pub t_max: f64,

    /// Seconds without output after which a live process counts as stalled.
    #[serde(default)]
    pub stall_timeout: Option<f64>,

    /// Files needed to resume; backed up and copied into restarts.
    #[serde(default)]
    pub checkpoint_files: Vec<String>,

    #[serde(default = "default_restart_prefix")]
    pub restart_prefix: String,
}

fn default_output_file() -> String {
    "output.txt".to_string()
}

fn default_error_file() -> String {
    "error.txt".to_string()
}

fn default_progress_pattern() -> String {
    r"^\s*t\s*=\s*([-+0-9.eE]+)".to_string()
}

fn default_restart_prefix() -> String {
    "restart_".to_string()
}

impl ShellParams {
    pub fn effective_restart_cmd(&self) -> &str {
        self.restart_cmd.as_deref().unwrap_or(&self.start_cmd)
    }

    fn stall_timeout(&self) -> Option<Duration> {
        self.stall_timeout
            .filter(|secs| secs.is_finite() && *secs > 0.0)
            .map(Duration::from_secs_f64)
    }
}

/// Generic command-driven simulation code.
#[derive(Debug, Clone, Default)]
pub struct ShellCode;

impl ShellCode {
    pub const NAME: &'static str = "shell";

    pub fn new() -> Self {
        Self
    }

    pub fn boxed() -> Box<dyn SimulationCode> {
        Box::new(Self::new())
    }

    fn params(&self, task: &TaskNode) -> Result<ShellParams> {
        let cfg = task
            .config
            .as_ref()
            .with_context(|| format!("{:?} has no {SIMULATION_CONFIG_FILE}", task.dir))?;
        toml::Value::Table(cfg.params.clone())
            .try_into::<ShellParams>()
            .with_context(|| format!("invalid shell parameters in {:?}", task.dir))
    }

    fn recorded_pid(&self, task: &TaskNode) -> Result<i32> {
        process::read_pid(&task.dir)
            .with_context(|| format!("no process recorded in {:?}", task.dir.join(PID_FILE)))
    }

    fn populate_and_launch(&self, task: &TaskNode, restart_dir: &Path, params: &ShellParams) -> Result<()> {
        copy_file(
            &task.dir.join(SIMULATION_CONFIG_FILE),
            &restart_dir.join(SIMULATION_CONFIG_FILE),
        )?;
        for name in &params.checkpoint_files {
            let source = [task.dir.join(name), task.dir.join(backup_name(name))]
                .into_iter()
                .find(|p| p.is_file());
            match source {
                Some(source) => copy_file(&source, &restart_dir.join(name))?,
                None => warn!(dir = ?task.dir, file = %name, "checkpoint file missing; restarting without it"),
            }
        }

        info!(id = task.id, from = ?task.dir, to = ?restart_dir, "restarting simulation");
        self.launch(restart_dir, params.effective_restart_cmd(), params)
    }

    fn launch(&self, dir: &Path, cmd: &str, params: &ShellParams) -> Result<()> {
        let pid = process::spawn_detached(dir, cmd, &params.output_file, &params.error_file)?;
        process::write_pid(dir, pid)
    }
}

impl SimulationCode for ShellCode {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn probe_status(&self, task: &TaskNode) -> Result<Probe> {
        let params = self.params(task)?;
        let dir = &task.dir;
        let output = dir.join(&params.output_file);

        let progress = read_progress(&output, &params.progress_pattern)?;
        let pid = process::read_pid(dir);

        let status = if dir.join(ERROR_MARKER).exists() {
            TaskStatus::Error
        } else if pid.is_some_and(process::is_alive) {
            let last_activity = latest_mtime(&[output.as_path(), dir.join(PID_FILE).as_path()]);
            if is_stalled(last_activity, SystemTime::now(), params.stall_timeout()) {
                TaskStatus::Stalled
            } else {
                TaskStatus::Running
            }
        } else if params.t_max > 0.0 && progress >= params.t_max {
            TaskStatus::Done
        } else if pid.is_some() || progress > 0.0 {
            TaskStatus::Stopped
        } else {
            TaskStatus::New
        };

        debug!(dir = ?dir, %status, progress, t_max = params.t_max, "shell probe");
        Ok(Probe::new(status, progress, params.t_max))
    }

    fn start(&self, task: &TaskNode) -> Result<()> {
        let params = self.params(task)?;
        info!(id = task.id, dir = ?task.dir, "starting simulation");
        self.launch(&task.dir, &params.start_cmd, &params)
    }

    fn restart(&self, task: &TaskNode) -> Result<()> {
        let params = self.params(task)?;
        let restart_dir = next_restart_dir(&task.dir, &params.restart_prefix)?;
        fs::create_dir(&restart_dir)
            .with_context(|| format!("creating restart directory {:?}", restart_dir))?;

        // A half-populated restart directory would be picked up as a NEW
        // run next pass, so it must not outlive a failed restart.
        if let Err(err) = self.populate_and_launch(task, &restart_dir, &params) {
            if let Err(cleanup) = fs::remove_dir_all(&restart_dir) {
                warn!(dir = ?restart_dir, error = %cleanup, "cannot remove failed restart directory");
            }
            return Err(err);
        }
        Ok(())
    }

    fn stop(&self, task: &TaskNode) -> Result<()> {
        let params = self.params(task)?;
        match params.stop_cmd {
            Some(ref cmd) => process::run_in_dir(&task.dir, cmd).map(|_| ()),
            None => process::send_signal(self.recorded_pid(task)?, Signal::SIGTERM),
        }
    }

    fn kill(&self, task: &TaskNode) -> Result<()> {
        process::send_signal(self.recorded_pid(task)?, Signal::SIGKILL)
    }

    fn backup_checkpoint(&self, task: &TaskNode) -> Result<()> {
        let params = self.params(task)?;
        let mut copied = 0;
        for name in &params.checkpoint_files {
            let source = task.dir.join(name);
            if source.is_file() {
                copy_file(&source, &task.dir.join(backup_name(name)))?;
                copied += 1;
            }
        }
        debug!(dir = ?task.dir, copied, "checkpoint backup");
        Ok(())
    }

    fn delete(&self, task: &TaskNode) -> Result<()> {
        warn!(id = task.id, dir = ?task.dir, "deleting simulation directory");
        fs::remove_dir_all(&task.dir).with_context(|| format!("removing {:?}", task.dir))
    }

    fn collect_recent_output(&self, task: &TaskNode) -> Result<String> {
        let params = self.params(task)?;
        let path = task.dir.join(&params.output_file);
        if !path.is_file() {
            return Ok(String::new());
        }
        Ok(tail(&read_lossy(&path)?, RECENT_OUTPUT_LINES))
    }

    fn run_shell_command(&self, task: &TaskNode, command: &str) -> Result<String> {
        process::run_in_dir(&task.dir, command)
    }
}

/// Last match of `pattern`'s first capture group in `path`, or `0` if the
/// file does not exist or never reports progress.
fn read_progress(path: &Path, pattern: &str) -> Result<f64> {
    let regex = Regex::new(pattern).with_context(|| format!("invalid progress_pattern {pattern:?}"))?;
    if !path.is_file() {
        return Ok(0.0);
    }
    let contents = read_lossy(path)?;
    Ok(parse_progress(&contents, &regex))
}

/// Simulation output may contain binary garbage; decode what is readable.
fn read_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {:?}", path))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn parse_progress(contents: &str, regex: &Regex) -> f64 {
    contents
        .lines()
        .filter_map(|line| regex.captures(line))
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .last()
        .unwrap_or(0.0)
}

fn latest_mtime(paths: &[&Path]) -> Option<SystemTime> {
    paths
        .iter()
        .filter_map(|p| fs::metadata(p).and_then(|m| m.modified()).ok())
        .max()
}

/// A live process is stalled if nothing was written for longer than
/// `timeout`. Without a timeout or any timestamp it never is.
pub fn is_stalled(last_activity: Option<SystemTime>, now: SystemTime, timeout: Option<Duration>) -> bool {
    match (last_activity, timeout) {
        (Some(last), Some(timeout)) => now
            .duration_since(last)
            .map(|idle| idle > timeout)
            .unwrap_or(false),
        _ => false,
    }
}

/// First unused `<prefix>NN` directory below `dir`, numbered from 01.
fn next_restart_dir(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let mut highest = 0u32;
    for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(suffix) = name.to_str().and_then(|n| n.strip_prefix(prefix)) else {
            continue;
        };
        if let Ok(n) = suffix.parse::<u32>() {
            highest = highest.max(n);
        }
    }
    Ok(dir.join(format!("{prefix}{:02}", highest + 1)))
}

fn backup_name(name: &str) -> String {
    format!("{name}.bak")
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.is_file() {
        bail!("{:?} does not exist", from);
    }
    fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
    Ok(())
}

fn tail(contents: &str, n: usize) -> String {
    let lines: Vec<&str> = contents.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_takes_last_match() {
        let regex = Regex::new(&default_progress_pattern()).unwrap();
        let out = "init\nt = 1.5\nnoise\nt= 2e1\nt = broken\n";
        assert_eq!(parse_progress(out, &regex), 20.0);
        assert_eq!(parse_progress("nothing here", &regex), 0.0);
    }

    #[test]
    fn stall_needs_timeout_and_old_activity() {
        let now = SystemTime::now();
        let old = now - Duration::from_secs(600);
        let timeout = Some(Duration::from_secs(60));

        assert!(is_stalled(Some(old), now, timeout));
        assert!(!is_stalled(Some(now), now, timeout));
        assert!(!is_stalled(Some(old), now, None));
        assert!(!is_stalled(None, now, timeout));
    }

    #[test]
    fn restart_dirs_are_numbered_after_highest() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            next_restart_dir(dir.path(), "restart_").unwrap(),
            dir.path().join("restart_01")
        );

        fs::create_dir(dir.path().join("restart_01")).unwrap();
        fs::create_dir(dir.path().join("restart_07")).unwrap();
        fs::create_dir(dir.path().join("restart_xx")).unwrap();
        assert_eq!(
            next_restart_dir(dir.path(), "restart_").unwrap(),
            dir.path().join("restart_08")
        );
    }

    #[test]
    fn tail_keeps_last_lines() {
        assert_eq!(tail("a\nb\nc\n", 2), "b\nc");
        assert_eq!(tail("a", 5), "a");
    }
}
