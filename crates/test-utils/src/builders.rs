#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use simon::code::CodeRegistry;
use simon::config::ConfigFile;
use simon::engine::Monitor;
use simon::fs::mock::MockFileSystem;
use simon::tree::ERROR_MARKER;
use simon::types::TaskStatus;

use crate::fake_code::FakeCode;

/// Builder for an in-memory simulation forest rooted at `"."`.
///
/// Each simulation gets a `simulation.toml` naming [`FakeCode`] and a
/// scripted probe result; paths are given relative to the root, e.g.
/// `"run_001/restart_01"`.
pub struct ForestBuilder {
    fs: MockFileSystem,
    code: FakeCode,
    max_jobs: usize,
}

impl ForestBuilder {
    pub fn new() -> Self {
        Self {
            fs: MockFileSystem::new(),
            code: FakeCode::new(),
            max_jobs: 2,
        }
    }

    /// Simulation directory with status, progress and niceness 0.
    pub fn sim(self, path: &str, status: TaskStatus, progress: f64) -> Self {
        self.sim_with(path, status, progress, 0)
    }

    pub fn sim_with(self, path: &str, status: TaskStatus, progress: f64, niceness: i32) -> Self {
        let dir = Self::dir(path);
        self.fs.add_file(
            dir.join("simulation.toml"),
            format!(
                "[simulation]\ncode_name = \"{}\"\nniceness = {niceness}\n",
                FakeCode::NAME
            ),
        );
        self.code.set_probe(&dir, status, progress, 100.0);
        self
    }

    /// Directory without a `simulation.toml`.
    pub fn plain_dir(self, path: &str) -> Self {
        self.fs.add_dir(Self::dir(path));
        self
    }

    /// Simulation directory naming a code nobody registered.
    pub fn sim_with_code(self, path: &str, code_name: &str) -> Self {
        self.fs.add_file(
            Self::dir(path).join("simulation.toml"),
            format!("[simulation]\ncode_name = \"{code_name}\"\n"),
        );
        self
    }

    pub fn error_marker(self, path: &str) -> Self {
        self.fs.add_file(Self::dir(path).join(ERROR_MARKER), "");
        self
    }

    pub fn max_jobs(mut self, max_jobs: usize) -> Self {
        self.max_jobs = max_jobs;
        self
    }

    /// Path of a simulation as the tree builder will see it.
    pub fn dir(path: &str) -> PathBuf {
        Path::new(".").join(path)
    }

    pub fn fs(&self) -> MockFileSystem {
        self.fs.clone()
    }

    pub fn code(&self) -> FakeCode {
        self.code.clone()
    }

    pub fn registry(&self) -> CodeRegistry {
        let mut registry = CodeRegistry::new();
        registry.register(self.code.clone());
        registry
    }

    /// Monitor over the forest, plus a handle on the shared fake code.
    pub fn build(self) -> (Monitor, FakeCode) {
        let config = ConfigFile::new(".").with_max_concurrent_jobs(self.max_jobs);
        let registry = self.registry();
        let monitor = Monitor::new(config, Arc::new(self.fs), registry)
            .expect("mock root must be a readable directory");
        (monitor, self.code)
    }
}

impl Default for ForestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
