// src/tree/builder.rs

//! Filesystem scan that turns a directory forest into a [`SimulationTree`].

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

use globset::{Glob, GlobMatcher};
use tracing::{debug, warn};

use crate::code::CodeRegistry;
use crate::config::{parse_simulation_config, SimulationConfig, SIMULATION_CONFIG_FILE};
use crate::errors::{Result, SimonError};
use crate::fs::FileSystem;
use crate::tree::forest::SimulationTree;
use crate::tree::ERROR_MARKER;
use crate::types::{TaskId, TaskStatus, ROOT_ID};

/// Directories nested deeper than this are not scanned (guards symlink loops).
pub const MAX_SCAN_DEPTH: usize = 64;

/// Compile the directory-name glob used while scanning.
pub fn compile_scan_pattern(pattern: &str) -> Result<GlobMatcher> {
    let glob = Glob::new(pattern).map_err(|e| {
        SimonError::ConfigError(format!("invalid scan pattern '{pattern}': {e}"))
    })?;
    Ok(glob.compile_matcher())
}

/// Builds the forest for one scheduling pass.
///
/// The scan never fails as a whole: unreadable directories, broken marker
/// files and failing probes are logged. A node whose probe fails keeps its
/// status from the previous pass, or stays undetermined if it has none.
pub struct TreeBuilder<'a> {
    fs: &'a dyn FileSystem,
    registry: &'a CodeRegistry,
    pattern: &'a GlobMatcher,
    last_known: Option<&'a HashMap<PathBuf, TaskStatus>>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(fs: &'a dyn FileSystem, registry: &'a CodeRegistry, pattern: &'a GlobMatcher) -> Self {
        Self {
            fs,
            registry,
            pattern,
            last_known: None,
        }
    }

    /// Statuses from an earlier pass, used when a probe fails.
    pub fn with_last_known(mut self, last_known: &'a HashMap<PathBuf, TaskStatus>) -> Self {
        self.last_known = Some(last_known);
        self
    }

    /// Scan `root` breadth-first and return the populated forest.
    ///
    /// Siblings are visited in lexicographic order, so ids are deterministic
    /// for a given on-disk state.
    pub fn build(&self, root: &Path) -> SimulationTree {
        let mut tree = SimulationTree::new(root);
        let mut queue = VecDeque::from([ROOT_ID]);

        while let Some(parent) = queue.pop_front() {
            if tree[parent].level >= MAX_SCAN_DEPTH {
                warn!(dir = ?tree[parent].dir, "maximum scan depth reached; not descending");
                continue;
            }

            let subdirs = self.matching_subdirs(&tree[parent].dir);
            for (name, dir) in subdirs {
                if tree.contains_dir(&dir) {
                    continue;
                }
                let id = self.discover(&mut tree, parent, name, dir);
                queue.push_back(id);
            }
        }

        debug!(nodes = tree.len(), root = ?root, "simulation tree built");
        tree
    }

    /// Sorted `(name, path)` pairs of subdirectories matching the pattern.
    fn matching_subdirs(&self, dir: &Path) -> Vec<(String, PathBuf)> {
        let entries = match self.fs.read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir = ?dir, error = %err, "cannot list directory; skipping subtree");
                return Vec::new();
            }
        };

        let mut subdirs: Vec<(String, PathBuf)> = entries
            .into_iter()
            .filter(|path| self.fs.is_dir(path))
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_string();
                self.pattern.is_match(&name).then_some((name, path))
            })
            .collect();
        subdirs.sort();
        subdirs
    }

    /// Register one directory: wire links, probe it, mirror its status onto
    /// the parent and nominate it as the parent's restart candidate.
    fn discover(&self, tree: &mut SimulationTree, parent: TaskId, name: String, dir: PathBuf) -> TaskId {
        let id = tree.insert_child(parent, name, dir);

        let config = self.load_marker(&tree[id].dir);
        let node = &mut tree[id];
        node.niceness = config.as_ref().map(|c| c.niceness).unwrap_or(0);
        node.config = config;

        match self.registry.probe(node) {
            Ok(probe) => node.apply_probe(probe),
            Err(SimonError::NoProvider(_)) => {}
            Err(err) => match self.last_known.and_then(|m| m.get(&node.dir).copied()) {
                Some(previous) => {
                    warn!(id, dir = ?node.dir, error = %err, status = %previous, "status probe failed; keeping last known status");
                    node.set_own_status(previous);
                }
                None => {
                    warn!(id, dir = ?node.dir, error = %err, "status probe failed and no earlier status; node will not be scheduled");
                }
            },
        }

        let status = node.status;
        let progress = node.progress;
        let target = node.progress_target;
        let errored = self.fs.exists(&node.dir.join(ERROR_MARKER));

        // Eager single-hop mirror; the closure pass settles the final state.
        tree[parent].status = status;

        if !errored && self.beats_current_candidate(tree, parent, progress) {
            let parent_node = &mut tree[parent];
            parent_node.restart_candidate = Some(id);
            parent_node.progress_target = target;
            debug!(parent, candidate = id, progress, "restart candidate nominated");
        }

        id
    }

    fn beats_current_candidate(&self, tree: &SimulationTree, parent: TaskId, progress: f64) -> bool {
        let parent_node = &tree[parent];
        if progress <= parent_node.progress {
            return false;
        }
        match parent_node.restart_candidate {
            Some(current) => progress > tree[current].progress,
            None => true,
        }
    }

    fn load_marker(&self, dir: &Path) -> Option<SimulationConfig> {
        let path = dir.join(SIMULATION_CONFIG_FILE);
        if !self.fs.is_file(&path) {
            debug!(dir = ?dir, "no {SIMULATION_CONFIG_FILE}; node cannot be dispatched");
            return None;
        }

        let parsed = self
            .fs
            .read_to_string(&path)
            .map_err(SimonError::from)
            .and_then(|contents| parse_simulation_config(&contents));

        match parsed {
            Ok(cfg) => Some(cfg),
            Err(err) => {
                warn!(path = ?path, error = %err, "unreadable simulation config; node cannot be dispatched");
                None
            }
        }
    }
}
