// tests/property_scheduler.rs

use proptest::prelude::*;
use simon::types::TaskStatus;
use simon_test_utils::ForestBuilder;

fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::New),
        Just(TaskStatus::Running),
        Just(TaskStatus::Stopped),
        Just(TaskStatus::Stalled),
        Just(TaskStatus::Error),
        Just(TaskStatus::Done),
    ]
}

// Flat forest of top-level simulations: (status, niceness) per directory.
fn flat_forest_strategy() -> impl Strategy<Value = Vec<(TaskStatus, i32)>> {
    proptest::collection::vec((status_strategy(), 0..3i32), 1..8)
}

// Nested forest: node i hangs below node `parent % i` (0 = root), so every
// generated shape is a valid tree.
fn nested_forest_strategy() -> impl Strategy<Value = Vec<(usize, TaskStatus, u8)>> {
    proptest::collection::vec((any::<usize>(), status_strategy(), 0..100u8), 1..16)
}

proptest! {
    #[test]
    fn admissions_fill_free_slots_in_priority_order(
        sims in flat_forest_strategy(),
        max_jobs in 1..4usize,
    ) {
        let mut builder = ForestBuilder::new().max_jobs(max_jobs);
        for (i, (status, nice)) in sims.iter().enumerate() {
            builder = builder.sim_with(&format!("s{i:02}"), *status, 0.0, *nice);
        }
        let (mut monitor, code) = builder.build();

        let running = sims.iter().filter(|(s, _)| *s == TaskStatus::Running).count();
        let mut eligible: Vec<(i32, usize)> = sims
            .iter()
            .enumerate()
            .filter(|(_, (s, _))| matches!(s, TaskStatus::New | TaskStatus::Stopped))
            .map(|(i, (_, nice))| (*nice, i))
            .collect();
        eligible.sort();
        let free = max_jobs.saturating_sub(running);
        let expected: Vec<String> = eligible
            .iter()
            .take(free)
            .map(|(_, i)| format!("s{i:02}"))
            .collect();

        let report = monitor.run_one_cycle();

        let admitted: Vec<String> = code
            .calls()
            .into_iter()
            .filter(|(_, action)| action == "start" || action == "restart")
            .map(|(name, _)| name)
            .collect();
        prop_assert_eq!(&admitted, &expected);
        prop_assert!(report.concurrent_jobs <= max_jobs.max(running));
        prop_assert_eq!(report.rebuilds, sims.iter().filter(|(s, _)| *s == TaskStatus::Stalled).count());
    }

    #[test]
    fn running_and_done_reach_every_ancestor(nodes in nested_forest_strategy()) {
        let mut paths: Vec<String> = Vec::new();
        let mut builder = ForestBuilder::new();
        for (i, (parent, status, progress)) in nodes.iter().enumerate() {
            let name = format!("n{i:02}");
            let path = match parent % (i + 1) {
                0 => name,
                p => format!("{}/{name}", paths[p - 1]),
            };
            builder = builder.sim(&path, *status, f64::from(*progress));
            paths.push(path);
        }
        let (mut monitor, _code) = builder.build();

        let tree = monitor.snapshot();
        prop_assert_eq!(tree.len(), nodes.len() + 1);
        for node in tree.tasks() {
            let Some(parent) = node.parent_id else { continue };
            let parent_status = tree[parent].status;
            match node.status {
                TaskStatus::Running => prop_assert_eq!(parent_status, TaskStatus::Running),
                TaskStatus::Done => prop_assert!(
                    matches!(parent_status, TaskStatus::Done | TaskStatus::Running)
                ),
                _ => {}
            }
            if let Some(cid) = node.restart_candidate {
                prop_assert!(tree[cid].progress > node.progress);
            }
        }
    }
}
