// tests/tree_build.rs

use std::error::Error;
use std::sync::Arc;

use simon::config::ConfigFile;
use simon::engine::Monitor;
use simon::types::{TaskStatus, ROOT_ID};
use simon_test_utils::{init_tracing, ForestBuilder};

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn every_directory_becomes_a_node_with_parent_links() -> TestResult {
    init_tracing();

    let (mut monitor, _code) = ForestBuilder::new()
        .sim("run_b", TaskStatus::New, 0.0)
        .sim("run_a", TaskStatus::Stopped, 10.0)
        .sim("run_a/restart_01", TaskStatus::Stopped, 20.0)
        .sim("run_a/restart_01/restart_01", TaskStatus::Stopped, 30.0)
        .plain_dir("notes")
        .build();

    let tree = monitor.snapshot();
    assert_eq!(tree.len(), 6);

    // Breadth-first, siblings sorted by name.
    let names: Vec<&str> = tree.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["root", "notes", "run_a", "run_b", "restart_01", "restart_01"]
    );

    for node in tree.tasks() {
        let parent = node.parent_id.ok_or("task without parent")?;
        assert!(tree[parent].children.contains(&node.id));
        assert_eq!(node.level, tree[parent].level + 1);
        assert_eq!(node.dir.parent(), Some(tree[parent].dir.as_path()));
    }

    let deep = tree
        .id_of(&ForestBuilder::dir("run_a/restart_01/restart_01"))
        .ok_or("deep node missing")?;
    assert_eq!(tree[deep].level, 3);
    assert_eq!(tree.ancestors(deep), vec![4, 2, ROOT_ID]);
    Ok(())
}

#[test]
fn ids_are_stable_across_rebuilds_of_an_unchanged_forest() -> TestResult {
    init_tracing();

    let (mut monitor, _code) = ForestBuilder::new()
        .sim("z", TaskStatus::New, 0.0)
        .sim("a", TaskStatus::New, 0.0)
        .sim("a/restart_01", TaskStatus::New, 0.0)
        .build();

    let first: Vec<_> = monitor.snapshot().iter().map(|n| (n.id, n.dir.clone())).collect();
    let second: Vec<_> = monitor.snapshot().iter().map(|n| (n.id, n.dir.clone())).collect();
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn restart_candidate_is_the_most_advanced_child() -> TestResult {
    init_tracing();

    let (mut monitor, _code) = ForestBuilder::new()
        .sim("run", TaskStatus::Stopped, 50.0)
        .sim("run/restart_01", TaskStatus::Stopped, 80.0)
        .sim("run/restart_02", TaskStatus::Stopped, 60.0)
        .sim("run/restart_03", TaskStatus::Stopped, 40.0)
        .build();

    let tree = monitor.snapshot();
    let run = tree.find_by_name("run").ok_or("run missing")?;
    let best = tree.id_of(&ForestBuilder::dir("run/restart_01"));
    assert_eq!(run.restart_candidate, best);
    assert_eq!(run.progress_target, 100.0);

    // A candidate always out-progresses its parent.
    for node in tree.iter() {
        if let Some(cid) = node.restart_candidate {
            assert!(tree[cid].progress > node.progress);
            assert_eq!(tree[cid].parent_id, Some(node.id));
        }
    }
    Ok(())
}

#[test]
fn error_marked_children_are_never_candidates() -> TestResult {
    init_tracing();

    let (mut monitor, _code) = ForestBuilder::new()
        .sim("run", TaskStatus::Stopped, 50.0)
        .sim("run/restart_01", TaskStatus::Error, 90.0)
        .error_marker("run/restart_01")
        .sim("run/restart_02", TaskStatus::Stopped, 70.0)
        .build();

    let tree = monitor.snapshot();
    let run = tree.find_by_name("run").ok_or("run missing")?;
    assert_eq!(
        run.restart_candidate,
        tree.id_of(&ForestBuilder::dir("run/restart_02"))
    );
    Ok(())
}

#[test]
fn less_advanced_children_leave_parent_without_candidate() -> TestResult {
    init_tracing();

    let (mut monitor, _code) = ForestBuilder::new()
        .sim("run", TaskStatus::Stopped, 50.0)
        .sim("run/restart_01", TaskStatus::Stopped, 50.0)
        .build();

    let tree = monitor.snapshot();
    assert_eq!(tree.find_by_name("run").ok_or("run missing")?.restart_candidate, None);
    Ok(())
}

#[test]
fn nodes_without_usable_code_are_kept_as_new() -> TestResult {
    init_tracing();

    let (mut monitor, _code) = ForestBuilder::new()
        .plain_dir("group")
        .sim_with_code("legacy", "gadget")
        .sim("group/run", TaskStatus::Stopped, 5.0)
        .build();

    let tree = monitor.snapshot();
    let legacy = tree.find_by_name("legacy").ok_or("legacy missing")?;
    assert_eq!(legacy.status, TaskStatus::New);
    assert_eq!(legacy.code_name(), Some("gadget"));

    let group = tree.find_by_name("group").ok_or("group missing")?;
    assert!(group.config.is_none());
    assert_eq!(group.children.len(), 1);
    Ok(())
}

#[test]
fn failed_status_check_keeps_last_known_status() -> TestResult {
    init_tracing();

    let builder = ForestBuilder::new()
        .sim("steady", TaskStatus::Running, 10.0)
        .sim("fresh", TaskStatus::Running, 10.0);
    let code = builder.code();
    code.fail_probe(ForestBuilder::dir("fresh"));
    let (mut monitor, _) = builder.build();

    let tree = monitor.snapshot();
    assert_eq!(tree.find_by_name("steady").ok_or("missing")?.status, TaskStatus::Running);
    // Never probed successfully: shown as NEW but marked unknown.
    let fresh = tree.find_by_name("fresh").ok_or("missing")?;
    assert_eq!(fresh.status, TaskStatus::New);
    assert!(!fresh.status_known);

    code.fail_probe(ForestBuilder::dir("steady"));
    let tree = monitor.snapshot();
    assert_eq!(tree.find_by_name("steady").ok_or("missing")?.status, TaskStatus::Running);
    assert_eq!(tree.len(), 3);
    Ok(())
}

#[test]
fn listing_shows_indented_statuses() -> TestResult {
    init_tracing();

    let (mut monitor, _code) = ForestBuilder::new()
        .sim("run_001", TaskStatus::Stopped, 50.0)
        .sim("run_001/restart_01", TaskStatus::Running, 80.0)
        .build();

    let text = monitor.snapshot().to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[1],
        "  [1] run_001  RUN  t=50/100  nice=0  cid=2  code=fake"
    );
    assert_eq!(
        lines[2],
        "    [2] restart_01  RUN  t=80/100  nice=0  code=fake"
    );
    Ok(())
}

#[test]
fn scan_pattern_limits_which_directories_are_simulations() -> TestResult {
    init_tracing();

    let builder = ForestBuilder::new()
        .sim("run_001", TaskStatus::Stopped, 5.0)
        .sim("run_001/run_restart", TaskStatus::Stopped, 8.0)
        .sim("run_001/plots", TaskStatus::New, 0.0)
        .plain_dir("archive");
    let config = ConfigFile::new(".").with_scan_pattern("run_*");
    let mut monitor = Monitor::new(config, Arc::new(builder.fs()), builder.registry())?;

    let tree = monitor.snapshot();
    let names: Vec<&str> = tree.tasks().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["run_001", "run_restart"]);
    Ok(())
}
