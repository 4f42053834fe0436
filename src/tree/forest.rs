// src/tree/forest.rs

//! Arena storage for the simulation forest.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};
use std::path::{Path, PathBuf};

use crate::tree::node::TaskNode;
use crate::types::{TaskId, TaskStatus, ROOT_ID};

/// All nodes of one scheduling pass, indexed by id.
///
/// Ids are dense and equal to the position in `nodes`; the root always
/// occupies slot `0`. A second index maps directories to ids.
#[derive(Debug, Clone)]
pub struct SimulationTree {
    nodes: Vec<TaskNode>,
    by_dir: HashMap<PathBuf, TaskId>,
}

impl SimulationTree {
    /// A forest containing only the synthetic root bound to `root_dir`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root = TaskNode::root(root_dir);
        let mut by_dir = HashMap::new();
        by_dir.insert(root.dir.clone(), ROOT_ID);
        Self {
            nodes: vec![root],
            by_dir,
        }
    }

    pub fn root(&self) -> &TaskNode {
        &self.nodes[ROOT_ID]
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskNode> {
        self.nodes.get_mut(id)
    }

    pub fn id_of(&self, dir: &Path) -> Option<TaskId> {
        self.by_dir.get(dir).copied()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&TaskNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn contains_dir(&self, dir: &Path) -> bool {
        self.by_dir.contains_key(dir)
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter()
    }

    /// All nodes except the root, in discovery order.
    pub fn tasks(&self) -> impl Iterator<Item = &TaskNode> {
        self.nodes.iter().skip(1)
    }

    /// Register a new child of `parent` and return its id.
    ///
    /// The caller guarantees `parent` exists and `dir` is not yet known.
    pub fn insert_child(&mut self, parent: TaskId, name: String, dir: PathBuf) -> TaskId {
        let id = self.nodes.len();
        let level = self.nodes[parent].level + 1;
        self.by_dir.insert(dir.clone(), id);
        self.nodes
            .push(TaskNode::new(id, name, dir, Some(parent), level));
        self.nodes[parent].children.push(id);
        id
    }

    /// Ancestors of `id`, nearest first, ending with the root.
    pub fn ancestors(&self, id: TaskId) -> Vec<TaskId> {
        let mut out = Vec::new();
        let mut current = self.get(id).and_then(|n| n.parent_id);
        while let Some(pid) = current {
            out.push(pid);
            current = self.nodes[pid].parent_id;
        }
        out
    }

    /// Follow `restart_candidate` links from `id` to the most advanced
    /// resumable leaf. Returns `id` itself if it has no candidate.
    pub fn restart_leaf(&self, id: TaskId) -> TaskId {
        let mut current = id;
        // Candidates are always children, so the walk is bounded by depth.
        while let Some(next) = self.nodes[current].restart_candidate {
            current = next;
        }
        current
    }

    /// Number of active execution slots in use: nodes whose own probe says
    /// RUNNING and that are not superseded by a restart candidate. Statuses
    /// inherited from descendants do not take a slot.
    pub fn concurrent_jobs(&self) -> usize {
        self.tasks()
            .filter(|n| n.own_status == TaskStatus::Running && n.restart_candidate.is_none())
            .count()
    }

    /// Dispatch priority: ascending niceness, ties broken by discovery id.
    pub fn dispatch_order(&self) -> Vec<TaskId> {
        let mut order: Vec<&TaskNode> = self.tasks().collect();
        order.sort_by_key(|n| (n.niceness, n.id));
        order.into_iter().map(|n| n.id).collect()
    }
}

impl Index<TaskId> for SimulationTree {
    type Output = TaskNode;

    fn index(&self, id: TaskId) -> &Self::Output {
        &self.nodes[id]
    }
}

impl IndexMut<TaskId> for SimulationTree {
    fn index_mut(&mut self, id: TaskId) -> &mut Self::Output {
        &mut self.nodes[id]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> SimulationTree {
        let mut tree = SimulationTree::new("/sims");
        let a = tree.insert_child(ROOT_ID, "a".into(), "/sims/a".into());
        let b = tree.insert_child(a, "b".into(), "/sims/a/b".into());
        let c = tree.insert_child(b, "c".into(), "/sims/a/b/c".into());
        tree[a].restart_candidate = Some(b);
        tree[b].restart_candidate = Some(c);
        tree
    }

    #[test]
    fn levels_and_links_follow_insertion() {
        let tree = chain();
        assert_eq!(tree[3].level, 3);
        assert_eq!(tree[1].children, vec![2]);
        assert_eq!(tree.ancestors(3), vec![2, 1, ROOT_ID]);
        assert_eq!(tree.id_of(Path::new("/sims/a/b")), Some(2));
    }

    #[test]
    fn restart_leaf_walks_candidate_chain() {
        let tree = chain();
        assert_eq!(tree.restart_leaf(1), 3);
        assert_eq!(tree.restart_leaf(3), 3);
    }

    #[test]
    fn dispatch_order_sorts_by_niceness_then_id() {
        let mut tree = chain();
        tree[1].niceness = 5;
        tree[2].niceness = 0;
        tree[3].niceness = 0;
        assert_eq!(tree.dispatch_order(), vec![2, 3, 1]);
    }

    #[test]
    fn superseded_running_nodes_do_not_count() {
        let mut tree = chain();
        for id in 1..=3 {
            tree[id].set_own_status(TaskStatus::Running);
        }
        assert_eq!(tree.concurrent_jobs(), 1);
    }

    #[test]
    fn inherited_running_does_not_take_a_slot() {
        let mut tree = SimulationTree::new("/sims");
        let run = tree.insert_child(ROOT_ID, "run".into(), "/sims/run".into());
        let child = tree.insert_child(run, "restart_01".into(), "/sims/run/restart_01".into());
        tree[run].set_own_status(TaskStatus::Stopped);
        tree[child].set_own_status(TaskStatus::Running);
        tree[run].status = TaskStatus::Running;

        assert_eq!(tree.concurrent_jobs(), 1);
    }
}
