// src/engine/mod.rs

//! Orchestration engine for runwatch.
//!
//! This module ties together:
//! - run discovery
//! - per-pipeline gating (already done, dependencies met)
//! - command building and execution
//! - post-analysis hooks
//!
//! The pure gating decision lives in [`core`]; one scan pass is driven by
//! [`orchestrator`], and the periodic daemon loop around it is
//! [`runtime`].

pub mod core;
pub mod hooks;
pub mod orchestrator;
pub mod runtime;

pub use hooks::{HookRegistry, PostAnalysisHook, TransferSpec};
pub use orchestrator::Orchestrator;
pub use runtime::{run_daemon, DaemonOptions};

/// Why a launched pipeline did not complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The work directory could not be created.
    Setup,
    /// The process failed to start, exited nonzero, or its marker could not
    /// be written.
    Process,
}

/// Final state of one (run, pipeline) pair in a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    SkippedUnmetDependency,
    SkippedAlreadyDone,
    /// A parameter could not be resolved from the run; nothing was launched.
    SkippedUnresolvedParameter,
    Completed,
    Failed(FailureKind),
}

impl PipelineState {
    /// True iff a process launch was attempted.
    pub fn launched(self) -> bool {
        matches!(
            self,
            PipelineState::Completed | PipelineState::Failed(FailureKind::Process)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    pub run_id: String,
    pub pipeline_name: String,
    pub pipeline_version: String,
    pub state: PipelineState,
}

/// Everything that happened in one scan pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub results: Vec<PipelineResult>,
    pub runs_found: usize,
    pub directories_skipped: usize,
}

impl PassSummary {
    /// Number of pipeline processes launched in this pass.
    pub fn launched(&self) -> usize {
        self.results.iter().filter(|r| r.state.launched()).count()
    }

    pub fn count(&self, state: PipelineState) -> usize {
        self.results.iter().filter(|r| r.state == state).count()
    }

    pub fn state_of(&self, run_id: &str, pipeline_name: &str) -> Option<PipelineState> {
        self.results
            .iter()
            .find(|r| r.run_id == run_id && r.pipeline_name == pipeline_name)
            .map(|r| r.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(run: &str, name: &str, state: PipelineState) -> PipelineResult {
        PipelineResult {
            run_id: run.into(),
            pipeline_name: name.into(),
            pipeline_version: "v1.0.0".into(),
            state,
        }
    }

    #[test]
    fn setup_failures_are_not_launches() {
        let summary = PassSummary {
            results: vec![
                result("r1", "org/a", PipelineState::Completed),
                result("r1", "org/b", PipelineState::Failed(FailureKind::Process)),
                result("r1", "org/c", PipelineState::Failed(FailureKind::Setup)),
                result("r1", "org/d", PipelineState::SkippedAlreadyDone),
            ],
            runs_found: 1,
            directories_skipped: 0,
        };
        assert_eq!(summary.launched(), 2);
        assert_eq!(
            summary.state_of("r1", "org/c"),
            Some(PipelineState::Failed(FailureKind::Setup))
        );
        assert_eq!(summary.state_of("r2", "org/a"), None);
    }
}
