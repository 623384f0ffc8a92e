// src/engine/orchestrator.rs

use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use tracing::{error, info, warn};

use crate::config::ConfigFile;
use crate::discovery::{self, DiscoveryItem, DiscoveryOptions, RunDescriptor, RunIdMatcher};
use crate::exec::{marker, CommandBuilder, ExecutionOutcome, PipelineExecutor, PipelineRunner};
use crate::fs::FileSystem;
use crate::pipeline::{DependencyGate, PipelineSpec};

use super::core::{decide, GateDecision};
use super::hooks::{HookContext, HookRegistry};
use super::{FailureKind, PassSummary, PipelineResult, PipelineState};

/// Drives one scan pass: discovery, then every configured pipeline for every
/// run, strictly one after another.
///
/// Holds no state between passes. Everything it needs to know about earlier
/// work is read back from the output tree.
pub struct Orchestrator<R: PipelineRunner> {
    config: ConfigFile,
    specs: Vec<PipelineSpec>,
    fs: Arc<dyn FileSystem>,
    runner: R,
    hooks: HookRegistry,
    matcher: RunIdMatcher,
    options: DiscoveryOptions,
}

impl<R: PipelineRunner> fmt::Debug for Orchestrator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("options", &self.options)
            .field("pipelines", &self.specs.len())
            .finish_non_exhaustive()
    }
}

impl<R: PipelineRunner> Orchestrator<R> {
    pub fn new(config: ConfigFile, fs: Arc<dyn FileSystem>, runner: R) -> Result<Self> {
        Ok(Self {
            specs: PipelineSpec::all_from_config(&config),
            hooks: HookRegistry::from_config(&config),
            matcher: RunIdMatcher::new()?,
            options: DiscoveryOptions::from_config(&config),
            config,
            fs,
            runner,
        })
    }

    /// Replace the hook registry, e.g. to register a hook in tests.
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = hooks;
        self
    }

    /// Run one full pass. Never fails: every problem is scoped to one
    /// directory or one (run, pipeline) pair and logged.
    pub async fn run_pass(&self) -> PassSummary {
        let fs = self.fs.as_ref();
        let mut summary = PassSummary::default();

        let scan = match discovery::scan(fs, &self.options, &self.matcher) {
            Ok(scan) => scan,
            Err(err) => {
                error!(
                    event_type = "scan_failed",
                    fastq_by_run_dir = %self.options.fastq_by_run_dir.display(),
                    error = %format!("{err:#}"),
                    "cannot list run directory root"
                );
                return summary;
            }
        };

        for item in scan {
            let run = match item {
                DiscoveryItem::Run(run) => run,
                DiscoveryItem::Skipped(_) => {
                    summary.directories_skipped += 1;
                    continue;
                }
            };
            summary.runs_found += 1;

            for spec in &self.specs {
                let state = self.process_pipeline(spec, &run).await;
                summary.results.push(PipelineResult {
                    run_id: run.run_id.clone(),
                    pipeline_name: spec.name().to_string(),
                    pipeline_version: spec.version().to_string(),
                    state,
                });
            }
        }

        info!(
            event_type = "scan_complete",
            runs_found = summary.runs_found,
            directories_skipped = summary.directories_skipped,
            pipelines_launched = summary.launched(),
            pipelines_completed = summary.count(PipelineState::Completed),
            "scan complete"
        );

        summary
    }

    async fn process_pipeline(&self, spec: &PipelineSpec, run: &RunDescriptor) -> PipelineState {
        let fs = self.fs.as_ref();
        let builder = CommandBuilder::new(fs, &self.config);
        let run_output_dir = self.config.config().analysis_output_dir.join(&run.run_id);
        let output_dir = spec.output_dir(&run_output_dir);

        let already_complete = marker::is_complete(fs, &output_dir);
        let deps = DependencyGate::new(fs).check(spec, &run_output_dir);

        if let GateDecision::Skip { state, conditions } = decide(already_complete, deps.all_complete()) {
            warn!(
                event_type = "analysis_skipped",
                sequencing_run_id = %run.run_id,
                pipeline_name = %spec.name(),
                pipeline_version = %spec.version(),
                conditions_checked = %conditions.to_json(),
                analysis_dependencies = %deps.records_json(),
                "analysis skipped"
            );
            return state;
        }

        let invocation = match builder.build(spec, run, Local::now()) {
            Ok(inv) => inv,
            Err(err) => {
                error!(
                    event_type = "analysis_skipped",
                    sequencing_run_id = %run.run_id,
                    pipeline_name = %spec.name(),
                    pipeline_version = %spec.version(),
                    error = %err,
                    "cannot build pipeline command"
                );
                return PipelineState::SkippedUnresolvedParameter;
            }
        };

        let executor = PipelineExecutor::new(fs, &self.runner);
        match executor.execute(&invocation).await {
            ExecutionOutcome::Success { .. } => {
                let ctx = HookContext {
                    run_id: &run.run_id,
                    spec,
                    output_dir: &invocation.output_dir,
                    now: Local::now(),
                };
                self.hooks.hook_for(spec.name()).run(fs, &ctx);
                PipelineState::Completed
            }
            ExecutionOutcome::ProcessFailure { .. } => PipelineState::Failed(FailureKind::Process),
            ExecutionOutcome::SetupFailure { .. } => PipelineState::Failed(FailureKind::Setup),
        }
    }
}
