// src/engine/runtime.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::config::{load_and_validate, ConfigFile};
use crate::discovery::{spawn_watcher, WakeReason, WatcherHandle};
use crate::exec::PipelineRunner;
use crate::fs::FileSystem;

use super::Orchestrator;

/// Inputs for [`run_daemon`].
#[derive(Debug, Clone)]
pub struct DaemonOptions {
    /// Re-read before every pass after the first.
    pub config_path: PathBuf,
}

/// Keeps the optional directory watcher in sync with the current config.
#[derive(Debug, Default)]
struct WatchState {
    root: Option<PathBuf>,
    handle: Option<WatcherHandle>,
}

impl WatchState {
    fn sync(&mut self, cfg: &ConfigFile, wake_tx: &mpsc::Sender<WakeReason>) {
        let section = cfg.config();
        if !section.watch_fastq_dir {
            if self.handle.take().is_some() {
                info!("file watcher stopped");
            }
            self.root = None;
            return;
        }
        if self.root.as_deref() == Some(section.fastq_by_run_dir.as_path()) && self.handle.is_some() {
            return;
        }
        match spawn_watcher(&section.fastq_by_run_dir, wake_tx.clone()) {
            Ok(handle) => {
                self.handle = Some(handle);
                self.root = Some(section.fastq_by_run_dir.clone());
            }
            Err(err) => {
                warn!(
                    fastq_by_run_dir = %section.fastq_by_run_dir.display(),
                    error = %format!("{err:#}"),
                    "cannot watch run directory root; relying on scan interval"
                );
                self.handle = None;
                self.root = None;
            }
        }
    }
}

/// What ends the wait between two passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextStep {
    Scan,
    Shutdown,
}

/// Periodic scan loop.
///
/// Runs a pass, then sleeps for `scan_interval_seconds` or until the
/// directory watcher reports a change, then reloads the config and repeats.
/// A config that fails to reload is logged and the previous one is kept.
/// Ctrl-C is only honoured between passes: a running pipeline is never
/// interrupted.
pub async fn run_daemon<R>(
    options: DaemonOptions,
    initial: ConfigFile,
    fs: Arc<dyn FileSystem>,
    runner: R,
) -> Result<()>
where
    R: PipelineRunner + Clone,
{
    let (wake_tx, mut wake_rx) = mpsc::channel::<WakeReason>(1);
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            return;
        }
        let _ = shutdown_tx.send(true);
    });

    let mut config = initial;
    let mut watcher_state = WatchState::default();

    info!(
        config_path = %options.config_path.display(),
        "runwatch daemon started"
    );

    loop {
        watcher_state.sync(&config, &wake_tx);

        let orchestrator = Orchestrator::new(config.clone(), Arc::clone(&fs), runner.clone())?;
        orchestrator.run_pass().await;

        let interval = Duration::from_secs(config.config().scan_interval_seconds);
        debug!(seconds = interval.as_secs(), "waiting for next scan");

        if wait_for_next_pass(interval, &mut wake_rx, &mut shutdown_rx).await == NextStep::Shutdown
        {
            info!("shutdown requested; exiting");
            break;
        }

        config = reload_or_keep(&options.config_path, config);
    }

    Ok(())
}

/// Wait out the scan interval, cut short by a watcher wake-up.
///
/// A shutdown request always wins, even when a wake-up is already queued.
async fn wait_for_next_pass(
    interval: Duration,
    wake_rx: &mut mpsc::Receiver<WakeReason>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> NextStep {
    if *shutdown_rx.borrow_and_update() {
        return NextStep::Shutdown;
    }

    tokio::select! {
        biased;

        Ok(()) = shutdown_rx.changed() => NextStep::Shutdown,
        reason = wake_rx.recv() => match reason {
            Some(WakeReason::FilesystemChange) => {
                debug!("run directory root changed; scanning early");
                NextStep::Scan
            }
            None => NextStep::Shutdown,
        },
        _ = tokio::time::sleep(interval) => NextStep::Scan,
    }
}

fn reload_or_keep(path: &Path, current: ConfigFile) -> ConfigFile {
    match load_and_validate(path) {
        Ok(cfg) => {
            info!(
                event_type = "config_loaded",
                config_path = %path.display(),
                pipelines = cfg.pipelines().len(),
                "config reloaded"
            );
            cfg
        }
        Err(err) => {
            warn!(
                event_type = "config_reload_failed",
                config_path = %path.display(),
                error = %err,
                "keeping previous config"
            );
            current
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONG: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn shutdown_wins_over_a_queued_wake_up() {
        let (wake_tx, mut wake_rx) = mpsc::channel(1);
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        wake_tx.try_send(WakeReason::FilesystemChange).unwrap();
        shutdown_tx.send(true).unwrap();

        let step = wait_for_next_pass(LONG, &mut wake_rx, &mut shutdown_rx).await;
        assert_eq!(step, NextStep::Shutdown);
    }

    #[tokio::test]
    async fn wake_up_triggers_an_early_scan() {
        let (wake_tx, mut wake_rx) = mpsc::channel(1);
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        wake_tx.try_send(WakeReason::FilesystemChange).unwrap();

        let step = wait_for_next_pass(LONG, &mut wake_rx, &mut shutdown_rx).await;
        assert_eq!(step, NextStep::Scan);
    }

    #[tokio::test]
    async fn interval_elapsing_triggers_a_scan() {
        let (_wake_tx, mut wake_rx) = mpsc::channel::<WakeReason>(1);
        let (_shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let step =
            wait_for_next_pass(Duration::from_millis(10), &mut wake_rx, &mut shutdown_rx).await;
        assert_eq!(step, NextStep::Scan);
    }
}
