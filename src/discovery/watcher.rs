// src/discovery/watcher.rs

use std::path::PathBuf;

use anyhow::Result;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Why the daemon loop woke up before its scan interval elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// Something was created or modified under the FASTQ root.
    FilesystemChange,
}

/// Handle for the filesystem watcher.
///
/// Dropping this handle stops watching.
pub struct WatcherHandle {
    _inner: RecommendedWatcher,
}

impl std::fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatcherHandle").finish()
    }
}

/// Watch the immediate contents of `root` and send
/// `WakeReason::FilesystemChange` into `wake_tx`.
///
/// Events are forwarded with `try_send`: while a wake-up is already pending,
/// further events are dropped, so a burst of changes costs one extra scan.
pub fn spawn_watcher(
    root: impl Into<PathBuf>,
    wake_tx: mpsc::Sender<WakeReason>,
) -> Result<WatcherHandle> {
    let root = root.into();
    let root = root.canonicalize().unwrap_or_else(|_| root.clone());

    let mut watcher = RecommendedWatcher::new(
        move |res: notify::Result<Event>| match res {
            Ok(event) => {
                if is_relevant(&event.kind) {
                    // Full channel means a wake-up is already pending.
                    let _ = wake_tx.try_send(WakeReason::FilesystemChange);
                }
            }
            Err(err) => {
                warn!(error = %err, "file watch error");
            }
        },
        Config::default(),
    )?;

    watcher.watch(&root, RecursiveMode::NonRecursive)?;

    info!("file watcher started on {:?}", root);

    Ok(WatcherHandle { _inner: watcher })
}

fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any
    )
}
