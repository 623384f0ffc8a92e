// src/discovery/mod.rs

//! Run discovery.
//!
//! - [`run_id`] holds the accepted instrument run-ID patterns.
//! - [`scanner`] walks the immediate subdirectories of the FASTQ root and
//!   classifies each one as a run to analyse or an explicit skip.
//! - [`watcher`] optionally wakes the daemon loop when the FASTQ root changes.
//!
//! Discovery never decides which pipelines run; it only yields runs.

pub mod run_id;
pub mod scanner;
pub mod watcher;

pub use run_id::RunIdMatcher;
pub use scanner::{
    scan, DiscoveryItem, DiscoveryOptions, RunDescriptor, RunScan, SkippedDirectory,
    READY_SENTINEL_FILE,
};
pub use watcher::{spawn_watcher, WakeReason, WatcherHandle};
