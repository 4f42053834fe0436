// src/engine/scheduler.rs

//! Auto-scheduler: one decision pass over the whole forest.
//!
//! Per node, in priority order (ascending niceness, then id):
//!
//! | status  | action                                                     |
//! |---------|------------------------------------------------------------|
//! | RUNNING | back up the checkpoint                                     |
//! | STALLED | kill, then rebuild the forest before going on              |
//! | STOPPED | top-level only, if a slot is free: restart the chain leaf  |
//! | NEW     | if a slot is free: start                                   |
//! | DONE    | nothing                                                    |
//! | ERROR   | nothing                                                    |
//!
//! Nodes without a usable simulation code, or whose status could never be
//! determined, are skipped. Slots are a plain counter compared against
//! `max_concurrent_jobs`; every issued start/restart takes one, whether or
//! not the action succeeds. Only a node's own RUNNING status occupies a
//! slot, never one inherited from a descendant.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::engine::core::Monitor;
use crate::engine::{Action, CycleReport, DispatchRecord};
use crate::types::{TaskId, TaskStatus};

/// Run one scheduling pass on `monitor`.
pub fn schedule_pass(monitor: &mut Monitor) -> CycleReport {
    let max_jobs = monitor.config().max_concurrent_jobs;
    let mut report = CycleReport::default();

    let mut concurrent_jobs = monitor.rebuild().concurrent_jobs();
    info!(
        nodes = monitor.tree().len(),
        concurrent_jobs, max_jobs, "scheduling pass started"
    );

    // Directories already dealt with; survives rebuilds, where ids may shift.
    let mut handled: HashSet<PathBuf> = HashSet::new();

    'pass: loop {
        for id in monitor.tree().dispatch_order() {
            let node = &monitor.tree()[id];
            if !handled.insert(node.dir.clone()) {
                continue;
            }
            if monitor.registry().resolve(node).is_err() {
                debug!(id, dir = ?node.dir, "no usable simulation code; not scheduling");
                continue;
            }
            if !node.status_known {
                debug!(id, dir = ?node.dir, "status never determined; not scheduling");
                continue;
            }
            let (status, level) = (node.status, node.level);
            debug!(id, name = %node.name, %status, "checking instance");

            match status {
                TaskStatus::Running => {
                    issue(monitor, &mut report, id, Action::Backup);
                }
                TaskStatus::Stalled => {
                    warn!(id, dir = ?node.dir, "stalled simulation; killing and rescanning");
                    issue(monitor, &mut report, id, Action::Kill);

                    let recount = monitor.rebuild().concurrent_jobs();
                    // Slots handed out earlier in this pass stay taken even if
                    // the freshly started processes are not visible yet.
                    concurrent_jobs = concurrent_jobs.max(recount);
                    report.rebuilds += 1;
                    continue 'pass;
                }
                TaskStatus::Stopped => {
                    if level != 1 {
                        continue;
                    }
                    if concurrent_jobs >= max_jobs {
                        debug!(id, concurrent_jobs, "no free slot for restart");
                        continue;
                    }
                    let leaf = monitor.tree().restart_leaf(id);
                    info!(
                        id,
                        leaf,
                        dir = ?monitor.tree()[leaf].dir,
                        "restarting simulation chain at its leaf"
                    );
                    issue(monitor, &mut report, leaf, Action::Restart);
                    concurrent_jobs += 1;
                }
                TaskStatus::New => {
                    if concurrent_jobs >= max_jobs {
                        debug!(id, concurrent_jobs, "no free slot for start");
                        continue;
                    }
                    issue(monitor, &mut report, id, Action::Start);
                    concurrent_jobs += 1;
                }
                TaskStatus::Done | TaskStatus::Error => {}
            }
        }
        break;
    }

    report.concurrent_jobs = concurrent_jobs;
    info!(
        dispatched = report.dispatched.len(),
        concurrent_jobs,
        rebuilds = report.rebuilds,
        "scheduling pass finished"
    );
    report
}

/// Dispatch `action` on `id`, log failures and record the outcome.
fn issue(monitor: &Monitor, report: &mut CycleReport, id: TaskId, action: Action) {
    let node = &monitor.tree()[id];
    let error = match monitor.dispatch(id, &action) {
        Ok(_) => None,
        Err(err) => {
            error!(id, dir = ?node.dir, %action, error = %err, "action failed; will re-evaluate next pass");
            Some(err.to_string())
        }
    };

    report.dispatched.push(DispatchRecord {
        id,
        name: node.name.clone(),
        dir: node.dir.clone(),
        action,
        error,
    });
}
