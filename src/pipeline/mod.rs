// src/pipeline/mod.rs

//! Pipeline specifications and dependency gating.
//!
//! - [`spec`] turns `[[pipeline]]` config entries into read-only
//!   [`PipelineSpec`]s and owns the output-directory naming scheme.
//! - [`gate`] decides whether all of a pipeline's upstream dependencies have
//!   written their completion markers for a run.

pub mod gate;
pub mod spec;

pub use gate::{DependencyGate, DependencyRecord, GateCheck};
pub use spec::{minor_version, output_dir_name, short_name, PipelineRef, PipelineSpec};
