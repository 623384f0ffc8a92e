// src/exec/mod.rs

//! Launching external pipelines.
//!
//! - [`command`] builds a [`PipelineInvocation`] from a spec and a run.
//! - [`backend`] abstracts how a process is actually spawned.
//! - [`executor`] owns the per-attempt protocol around the process: work dir
//!   creation, completion marker, and cleanup.
//! - [`marker`] reads and writes completion markers.

pub mod backend;
pub mod command;
pub mod executor;
pub mod marker;

pub use backend::{PipelineRunner, ProcessOutput, ProcessRunner};
pub use command::{CommandBuilder, PipelineInvocation};
pub use executor::{CleanupStatus, ExecutionOutcome, PipelineExecutor};
pub use marker::{CompletionMarker, COMPLETION_MARKER_FILE};
