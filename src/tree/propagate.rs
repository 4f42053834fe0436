// src/tree/propagate.rs

//! Status closure: ancestors reflect live or finished descendants.

use tracing::{debug, warn};

use crate::tree::forest::SimulationTree;
use crate::types::TaskStatus;

/// Upper bound on full propagation passes.
///
/// One pass moves a status up at least one level, so any forest shallower
/// than this converges.
pub const MAX_PROPAGATION_PASSES: usize = 30;

/// Outcome of [`propagate_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Propagation {
    /// Number of passes performed (the last one made no change if converged).
    pub passes: usize,
    pub converged: bool,
}

/// Push RUNNING/DONE from every node onto its parent until nothing changes
/// or [`MAX_PROPAGATION_PASSES`] is exhausted.
///
/// RUNNING wins over DONE: a parent with one running and one finished
/// child stays RUNNING, which keeps the iteration monotone.
pub fn propagate_status(tree: &mut SimulationTree) -> Propagation {
    for pass in 1..=MAX_PROPAGATION_PASSES {
        let mut modified = false;

        for id in 1..tree.len() {
            let status = tree[id].status;
            if !status.propagates() {
                continue;
            }
            let Some(parent) = tree[id].parent_id else {
                continue;
            };
            if overrides(tree[parent].status, status) {
                tree[parent].status = status;
                modified = true;
            }
        }

        if !modified {
            debug!(passes = pass, "status propagation converged");
            return Propagation {
                passes: pass,
                converged: true,
            };
        }
    }

    warn!(
        passes = MAX_PROPAGATION_PASSES,
        "status propagation did not converge; keeping best-effort statuses"
    );
    Propagation {
        passes: MAX_PROPAGATION_PASSES,
        converged: false,
    }
}

fn overrides(parent: TaskStatus, child: TaskStatus) -> bool {
    parent != child && !(parent == TaskStatus::Running && child == TaskStatus::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ROOT_ID;

    fn line(depth: usize) -> SimulationTree {
        let mut tree = SimulationTree::new("/r");
        let mut parent = ROOT_ID;
        for i in 0..depth {
            let dir = tree[parent].dir.join(format!("d{i}"));
            parent = tree.insert_child(parent, format!("d{i}"), dir);
            tree[parent].status = TaskStatus::Stopped;
        }
        tree
    }

    #[test]
    fn running_leaf_reaches_root() {
        let mut tree = line(5);
        tree[5].status = TaskStatus::Running;

        let outcome = propagate_status(&mut tree);

        assert!(outcome.converged);
        assert!(tree.iter().all(|n| n.status == TaskStatus::Running));
    }

    #[test]
    fn running_sibling_beats_done_sibling() {
        let mut tree = SimulationTree::new("/r");
        let a = tree.insert_child(ROOT_ID, "a".into(), "/r/a".into());
        let b = tree.insert_child(a, "b".into(), "/r/a/b".into());
        let c = tree.insert_child(a, "c".into(), "/r/a/c".into());
        tree[b].status = TaskStatus::Running;
        tree[c].status = TaskStatus::Done;

        assert!(propagate_status(&mut tree).converged);
        assert_eq!(tree[a].status, TaskStatus::Running);
    }

    #[test]
    fn non_propagating_statuses_stay_local() {
        let mut tree = line(2);
        tree[2].status = TaskStatus::Error;

        let outcome = propagate_status(&mut tree);

        assert_eq!(outcome.passes, 1);
        assert_eq!(tree[1].status, TaskStatus::Stopped);
    }

    #[test]
    fn depth_29_converges_within_bound() {
        let mut tree = line(29);
        tree[29].status = TaskStatus::Done;

        let outcome = propagate_status(&mut tree);

        assert!(outcome.converged);
        assert_eq!(outcome.passes, MAX_PROPAGATION_PASSES);
        assert_eq!(tree.root().status, TaskStatus::Done);
    }

    #[test]
    fn too_deep_forest_exhausts_bound_without_failing() {
        let mut tree = line(40);
        tree[40].status = TaskStatus::Done;

        let outcome = propagate_status(&mut tree);

        // Deeper nodes have larger ids, so each pass climbs one level.
        assert!(!outcome.converged);
        assert_eq!(tree[10].status, TaskStatus::Done);
        assert_eq!(tree[9].status, TaskStatus::Stopped);
        assert_eq!(tree.root().status, TaskStatus::New);
    }
}
