// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// File name of the per-simulation marker/config file.
pub const SIMULATION_CONFIG_FILE: &str = "simulation.toml";

/// Default number of simultaneously active simulations.
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 2;

/// Default pause between two scheduling passes, in seconds.
pub const DEFAULT_DAEMON_SLEEP_TIME: f64 = 180.0;

/// Monitor configuration as read from a TOML file, before validation.
///
/// ```toml
/// [simon]
/// root_dir = "sims"
/// max_concurrent_jobs = 2
/// daemon_sleep_time = 180
/// scan_pattern = "*"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub simon: SimonSection,
}

/// `[simon]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct SimonSection {
    /// Root of the simulation forest. Required.
    ///
    /// Relative paths are resolved against the directory holding the config
    /// file (see [`crate::config::loader::load_and_validate`]).
    #[serde(default)]
    pub root_dir: Option<PathBuf>,

    /// Concurrency ceiling for started/restarted simulations.
    #[serde(default = "default_max_concurrent_jobs")]
    pub max_concurrent_jobs: usize,

    /// Seconds between two scheduling passes in daemon mode.
    #[serde(default = "default_daemon_sleep_time")]
    pub daemon_sleep_time: f64,

    /// Glob matched against directory names while scanning the forest.
    #[serde(default = "default_scan_pattern")]
    pub scan_pattern: String,
}

fn default_max_concurrent_jobs() -> usize {
    DEFAULT_MAX_CONCURRENT_JOBS
}

fn default_daemon_sleep_time() -> f64 {
    DEFAULT_DAEMON_SLEEP_TIME
}

fn default_scan_pattern() -> String {
    "*".to_string()
}

impl Default for SimonSection {
    fn default() -> Self {
        Self {
            root_dir: None,
            max_concurrent_jobs: default_max_concurrent_jobs(),
            daemon_sleep_time: default_daemon_sleep_time(),
            scan_pattern: default_scan_pattern(),
        }
    }
}

/// Validated monitor configuration.
///
/// Only obtainable through `TryFrom<RawConfigFile>` (see `validate.rs`) or
/// [`ConfigFile::new`], so the rest of the crate can rely on its invariants.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub root_dir: PathBuf,
    pub max_concurrent_jobs: usize,
    pub interval: Duration,
    pub scan_pattern: String,
}

impl ConfigFile {
    /// Configuration with default values for everything but the root.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            interval: Duration::from_secs_f64(DEFAULT_DAEMON_SLEEP_TIME),
            scan_pattern: default_scan_pattern(),
        }
    }

    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    pub fn with_scan_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.scan_pattern = pattern.into();
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

/// Contents of a per-simulation `simulation.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationFile {
    pub simulation: SimulationConfig,
}

/// `[simulation]` section of a simulation directory.
///
/// ```toml
/// [simulation]
/// code_name = "shell"
/// niceness = 5
/// start_cmd = "./nbody --input ic.dat"
/// t_max = 100
/// ```
///
/// Keys other than `code_name` and `niceness` belong to the simulation code
/// and are kept verbatim in `params`.
#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    pub code_name: String,

    /// Scheduling priority; lower values are dispatched first.
    #[serde(default)]
    pub niceness: i32,

    #[serde(flatten)]
    pub params: toml::Table,
}
