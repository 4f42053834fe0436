// src/engine/runtime.rs

use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::errors::Result;

use super::core::Monitor;
use super::RuntimeEvent;

/// Drives the [`Monitor`] in response to `RuntimeEvent`s.
///
/// This is a thin async shell: each `Tick` runs one blocking scheduling pass
/// on the blocking thread pool, `ShutdownRequested` (or a closed channel)
/// ends the loop. Passes never overlap.
#[derive(Debug)]
pub struct Runtime {
    monitor: Monitor,
    event_rx: mpsc::Receiver<RuntimeEvent>,
}

impl Runtime {
    pub fn new(monitor: Monitor, event_rx: mpsc::Receiver<RuntimeEvent>) -> Self {
        Self { monitor, event_rx }
    }

    /// Main event loop. Returns the monitor so callers can inspect the last
    /// forest after shutdown.
    pub async fn run(self) -> Result<Monitor> {
        let Runtime {
            mut monitor,
            mut event_rx,
        } = self;
        info!("SiMon runtime started");

        loop {
            let event = match event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::Tick => {
                    info!("SiMon routine checking...");
                    let (returned, report) = tokio::task::spawn_blocking(move || {
                        let report = monitor.run_one_cycle();
                        (monitor, report)
                    })
                    .await
                    .map_err(anyhow::Error::from)?;
                    monitor = returned;

                    for record in report.dispatched.iter().filter(|r| !r.succeeded()) {
                        debug!(id = record.id, action = %record.action, "failed dispatch will be retried next pass");
                    }
                }
                RuntimeEvent::ShutdownRequested => {
                    info!("shutdown requested; stopping runtime");
                    break;
                }
            }
        }

        info!("runtime exiting");
        Ok(monitor)
    }
}

/// Send a `Tick` every `period`, the first one immediately.
///
/// The ticker stops once the runtime has gone away.
pub fn spawn_ticker(tx: mpsc::Sender<RuntimeEvent>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // A slow pass should not cause a burst of catch-up passes.
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if tx.send(RuntimeEvent::Tick).await.is_err() {
                debug!("runtime gone; ticker stopping");
                break;
            }
        }
    })
}
