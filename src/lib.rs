// src/lib.rs

pub mod cli;
pub mod code;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod selection;
pub mod tree;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::{CliArgs, Command};
use crate::code::CodeRegistry;
use crate::config::{load_and_validate, ConfigFile};
use crate::engine::runtime::spawn_ticker;
use crate::engine::{CycleReport, Monitor, Runtime, RuntimeEvent};
use crate::fs::RealFileSystem;
use crate::selection::parse_selection;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - the monitor with the built-in simulation codes
/// - the requested command (daemon loop, single pass, listing, actions)
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = resolve_config(&args)?;
    let mut monitor = Monitor::new(
        cfg,
        Arc::new(RealFileSystem),
        CodeRegistry::with_builtin_codes(),
    )?;

    match args.command {
        Command::Daemon => run_daemon(monitor).await,
        Command::Once => {
            let report = tokio::task::spawn_blocking(move || monitor.run_one_cycle()).await?;
            print_report(&report);
            Ok(())
        }
        Command::List => {
            let listing = tokio::task::spawn_blocking(move || monitor.snapshot().to_string()).await?;
            print!("{listing}");
            Ok(())
        }
        Command::Action { action, ids, cmd } => {
            let action = action.into_action(cmd);
            let selection = parse_selection(&ids);
            for err in &selection.rejected {
                eprintln!("{err}");
            }

            let results = tokio::task::spawn_blocking(move || {
                monitor.rebuild();
                monitor.dispatch_many(&selection.ids, &action)
            })
            .await?;

            let mut failures = 0;
            for (id, result) in results {
                match result {
                    Ok(output) if output.is_empty() => println!("[{id}] ok"),
                    Ok(output) => println!("[{id}]\n{}", output.trim_end()),
                    Err(err) => {
                        failures += 1;
                        println!("[{id}] {err}");
                    }
                }
            }
            debug!(failures, "action batch finished");
            Ok(())
        }
    }
}

/// Load `SiMon.toml` (if present) and apply CLI overrides on top.
fn resolve_config(args: &CliArgs) -> Result<ConfigFile> {
    let path = Path::new(&args.config);
    let mut cfg = if path.is_file() {
        load_and_validate(path).with_context(|| format!("loading {}", path.display()))?
    } else if let Some(root) = &args.root_dir {
        warn!(config = %path.display(), "config file not found; using defaults");
        ConfigFile::new(root.clone())
    } else {
        bail!(
            "config file {} not found and no --root-dir given",
            path.display()
        );
    };

    if let Some(root) = &args.root_dir {
        cfg.root_dir = root.clone();
    }
    if let Some(max) = args.max_jobs {
        cfg.max_concurrent_jobs = max as usize;
    }
    if let Some(secs) = args.interval {
        if !secs.is_finite() || secs <= 0.0 {
            bail!("--interval must be a positive number of seconds, got {secs}");
        }
        cfg.interval = Duration::from_secs_f64(secs);
    }

    Ok(cfg)
}

async fn run_daemon(monitor: Monitor) -> Result<()> {
    let interval = monitor.config().interval;
    let (rt_tx, rt_rx) = mpsc::channel::<RuntimeEvent>(16);

    // Ctrl-C → graceful shutdown.
    {
        let tx = rt_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(RuntimeEvent::ShutdownRequested).await;
        });
    }

    info!(?interval, "starting daemon loop");
    let ticker = spawn_ticker(rt_tx, interval);

    let result = Runtime::new(monitor, rt_rx).run().await;
    ticker.abort();
    result?;
    Ok(())
}

fn print_report(report: &CycleReport) {
    if report.dispatched.is_empty() {
        println!("nothing to do");
    }
    for record in &report.dispatched {
        match &record.error {
            None => println!("[{}] {}  {}", record.id, record.action, record.dir.display()),
            Some(err) => println!(
                "[{}] {}  {}  FAILED: {err}",
                record.id,
                record.action,
                record.dir.display()
            ),
        }
    }
    println!(
        "concurrent jobs: {}  rebuilds: {}",
        report.concurrent_jobs, report.rebuilds
    );
}
