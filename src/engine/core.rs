// src/engine/core.rs

//! The monitor context object.
//!
//! [`Monitor`] bundles everything one scheduling pass needs (configuration,
//! filesystem view, code registry) and exposes the driver-facing API:
//! [`Monitor::run_one_cycle`], [`Monitor::snapshot`] and per-id
//! [`Monitor::dispatch`]. It performs blocking IO and is meant to be driven
//! by one caller at a time.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use globset::GlobMatcher;
use tracing::{debug, error, info, warn};

use crate::code::CodeRegistry;
use crate::config::ConfigFile;
use crate::engine::scheduler::schedule_pass;
use crate::engine::{Action, CycleReport};
use crate::errors::{Result, SimonError};
use crate::fs::FileSystem;
use crate::tree::{compile_scan_pattern, propagate_status, SimulationTree, TreeBuilder};
use crate::types::{TaskId, TaskStatus, ROOT_ID};

pub struct Monitor {
    config: ConfigFile,
    fs: Arc<dyn FileSystem>,
    registry: CodeRegistry,
    pattern: GlobMatcher,
    /// Own status of each directory at the end of the previous rebuild;
    /// only consulted when a probe fails.
    last_known: HashMap<PathBuf, TaskStatus>,
    tree: SimulationTree,
}

impl std::fmt::Debug for Monitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Monitor")
            .field("config", &self.config)
            .field("registry", &self.registry)
            .field("nodes", &self.tree.len())
            .finish_non_exhaustive()
    }
}

impl Monitor {
    /// Create a monitor for `config.root_dir`.
    ///
    /// Fails if the root directory is not a readable directory or the scan
    /// pattern is invalid; both are startup-time hard stops.
    pub fn new(config: ConfigFile, fs: Arc<dyn FileSystem>, registry: CodeRegistry) -> Result<Self> {
        if !fs.is_dir(&config.root_dir) || fs.read_dir(&config.root_dir).is_err() {
            return Err(SimonError::RootDir(config.root_dir.clone()));
        }
        let pattern = compile_scan_pattern(&config.scan_pattern)?;
        let tree = SimulationTree::new(config.root_dir.clone());

        info!(
            root = ?config.root_dir,
            max_concurrent_jobs = config.max_concurrent_jobs,
            codes = ?registry.names().collect::<Vec<_>>(),
            "monitor initialised"
        );

        Ok(Self {
            config,
            fs,
            registry,
            pattern,
            last_known: HashMap::new(),
            tree,
        })
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn registry(&self) -> &CodeRegistry {
        &self.registry
    }

    /// Forest as of the last rebuild (root only before the first one).
    pub fn tree(&self) -> &SimulationTree {
        &self.tree
    }

    /// Rescan the root and bring every status up to date.
    ///
    /// 1. Build the forest (probing each node as it is discovered).
    /// 2. Propagate RUNNING/DONE to ancestors.
    /// 3. Re-probe every node, then re-establish the propagation closure
    ///    so the refresh cannot revert an inherited RUNNING/DONE.
    pub fn rebuild(&mut self) -> &SimulationTree {
        let mut tree = TreeBuilder::new(self.fs.as_ref(), &self.registry, &self.pattern)
            .with_last_known(&self.last_known)
            .build(&self.config.root_dir);
        propagate_status(&mut tree);

        self.refresh(&mut tree);
        propagate_status(&mut tree);

        self.last_known = tree
            .tasks()
            .filter(|n| n.status_known)
            .map(|n| (n.dir.clone(), n.own_status))
            .collect();
        self.tree = tree;
        &self.tree
    }

    fn refresh(&self, tree: &mut SimulationTree) {
        for id in 1..tree.len() {
            let node = &mut tree[id];
            match self.registry.probe(node) {
                Ok(probe) => node.set_own_status(probe.status),
                Err(err) => {
                    debug!(id, dir = ?node.dir, error = %err, "refresh probe failed; keeping status")
                }
            }
        }
    }

    /// Rebuild and return the forest for display.
    pub fn snapshot(&mut self) -> &SimulationTree {
        self.rebuild()
    }

    /// One full scheduling pass. See [`crate::engine::scheduler`].
    pub fn run_one_cycle(&mut self) -> CycleReport {
        schedule_pass(self)
    }

    /// Apply `action` to node `id` of the current forest.
    ///
    /// Returns the textual output for `check`/`exec`, an empty string
    /// otherwise.
    pub fn dispatch(&self, id: TaskId, action: &Action) -> Result<String> {
        if id == ROOT_ID {
            return Err(SimonError::InvalidSelection(
                "the root group cannot be dispatched".to_string(),
            ));
        }
        let node = self.tree.get(id).ok_or(SimonError::TaskNotFound(id))?;
        let code = self.registry.resolve(node)?;

        debug!(id, dir = ?node.dir, %action, code = code.name(), "dispatching action");

        let outcome = match action {
            Action::Start => code.start(node).map(|_| String::new()),
            Action::Restart => code.restart(node).map(|_| String::new()),
            Action::Check => code.collect_recent_output(node),
            Action::Stop => code.stop(node).map(|_| String::new()),
            Action::Delete => code.delete(node).map(|_| String::new()),
            Action::Kill => code.kill(node).map(|_| String::new()),
            Action::Backup => code.backup_checkpoint(node).map(|_| String::new()),
            Action::Exec(cmd) => code.run_shell_command(node, cmd),
        };

        outcome.map_err(|source| SimonError::Action {
            action: action.name(),
            dir: node.dir.clone(),
            source,
        })
    }

    /// Apply `action` to each id; failures are reported per id and never
    /// stop the batch.
    pub fn dispatch_many(&self, ids: &[TaskId], action: &Action) -> Vec<(TaskId, Result<String>)> {
        ids.iter()
            .map(|&id| {
                let result = self.dispatch(id, action);
                if let Err(ref err) = result {
                    match err {
                        SimonError::TaskNotFound(_) => warn!(id, "{err}"),
                        _ => error!(id, %action, error = %err, "action failed"),
                    }
                }
                (id, result)
            })
            .collect()
    }
}
