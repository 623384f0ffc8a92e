// src/exec/executor.rs

//! Runs one built invocation: work dir setup, process, marker, cleanup.

use chrono::Local;
use tracing::{error, info, warn};

use super::backend::PipelineRunner;
use super::command::PipelineInvocation;
use super::marker::CompletionMarker;
use crate::fs::FileSystem;

/// Whether the work directory was removed after a successful attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    Deleted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Exit status 0 and the completion marker was written.
    Success {
        marker: CompletionMarker,
        cleanup: CleanupStatus,
    },
    /// The process exited nonzero, could not be started, or its marker could
    /// not be written. The work directory is left in place.
    ProcessFailure {
        exit_code: Option<i32>,
        detail: String,
    },
    /// The work directory could not be created. Nothing was launched.
    SetupFailure { reason: String },
}

impl ExecutionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionOutcome::Success { .. })
    }
}

#[derive(Clone, Copy)]
pub struct PipelineExecutor<'a> {
    fs: &'a dyn FileSystem,
    runner: &'a dyn PipelineRunner,
}

impl std::fmt::Debug for PipelineExecutor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl<'a> PipelineExecutor<'a> {
    pub fn new(fs: &'a dyn FileSystem, runner: &'a dyn PipelineRunner) -> Self {
        Self { fs, runner }
    }

    pub async fn execute(&self, inv: &PipelineInvocation) -> ExecutionOutcome {
        let command_line = inv.command_line();

        if let Err(reason) = self.set_up(inv) {
            error!(
                event_type = "analysis_setup_failed",
                sequencing_run_id = %inv.run_id,
                pipeline_name = %inv.pipeline.name,
                pipeline_version = %inv.pipeline.version,
                analysis_work_dir = %inv.work_dir.display(),
                error = %reason,
                "could not create analysis work dir"
            );
            return ExecutionOutcome::SetupFailure { reason };
        }

        info!(
            event_type = "analysis_started",
            sequencing_run_id = %inv.run_id,
            pipeline_name = %inv.pipeline.name,
            pipeline_version = %inv.pipeline.version,
            pipeline_command = %command_line,
            analysis_output_dir = %inv.output_dir.display(),
            analysis_work_dir = %inv.work_dir.display(),
            "starting analysis"
        );

        let output = match self.runner.run(inv).await {
            Ok(output) => output,
            Err(err) => {
                let detail = format!("{err:#}");
                self.log_failure(inv, &command_line, None, &detail);
                return ExecutionOutcome::ProcessFailure {
                    exit_code: None,
                    detail,
                };
            }
        };

        if !output.success() {
            let detail = output.combined();
            self.log_failure(inv, &command_line, output.exit_code, &detail);
            return ExecutionOutcome::ProcessFailure {
                exit_code: output.exit_code,
                detail,
            };
        }

        let marker = CompletionMarker::new(inv.launched_at, Local::now());
        let marker_path = match marker.write(self.fs, &inv.output_dir) {
            Ok(path) => path,
            Err(err) => {
                let detail = format!("pipeline exited 0 but writing completion marker failed: {err:#}");
                self.log_failure(inv, &command_line, output.exit_code, &detail);
                return ExecutionOutcome::ProcessFailure {
                    exit_code: output.exit_code,
                    detail,
                };
            }
        };

        info!(
            event_type = "analysis_completed",
            sequencing_run_id = %inv.run_id,
            pipeline_name = %inv.pipeline.name,
            pipeline_version = %inv.pipeline.version,
            pipeline_command = %command_line,
            analysis_complete_path = %marker_path.display(),
            timestamp_analysis_start = %marker.timestamp_analysis_start.to_rfc3339(),
            timestamp_analysis_complete = %marker.timestamp_analysis_complete.to_rfc3339(),
            "analysis completed"
        );

        let cleanup = self.clean_up(inv);
        ExecutionOutcome::Success { marker, cleanup }
    }

    fn set_up(&self, inv: &PipelineInvocation) -> Result<(), String> {
        let prepare = || -> anyhow::Result<()> {
            if let Some(parent) = inv.work_dir.parent() {
                self.fs.create_dir_all(parent)?;
            }
            self.fs.create_dir(&inv.work_dir)?;
            self.fs.create_dir_all(&inv.output_dir)?;
            Ok(())
        };
        prepare().map_err(|e| format!("{e:#}"))
    }

    fn clean_up(&self, inv: &PipelineInvocation) -> CleanupStatus {
        if !self.fs.is_dir(&inv.work_dir) {
            warn!(
                event_type = "analysis_work_dir_not_found",
                sequencing_run_id = %inv.run_id,
                pipeline_name = %inv.pipeline.name,
                analysis_work_dir = %inv.work_dir.display(),
                "analysis work dir missing at cleanup"
            );
            return CleanupStatus::Failed("work dir not found".to_string());
        }

        match self.fs.remove_dir_all(&inv.work_dir) {
            Ok(()) => {
                info!(
                    event_type = "analysis_work_dir_deleted",
                    sequencing_run_id = %inv.run_id,
                    pipeline_name = %inv.pipeline.name,
                    analysis_work_dir = %inv.work_dir.display(),
                    "deleted analysis work dir"
                );
                CleanupStatus::Deleted
            }
            Err(err) => {
                let reason = format!("{err:#}");
                warn!(
                    event_type = "delete_analysis_work_dir_failed",
                    sequencing_run_id = %inv.run_id,
                    pipeline_name = %inv.pipeline.name,
                    analysis_work_dir = %inv.work_dir.display(),
                    error = %reason,
                    "failed to delete analysis work dir"
                );
                CleanupStatus::Failed(reason)
            }
        }
    }

    fn log_failure(
        &self,
        inv: &PipelineInvocation,
        command_line: &str,
        exit_code: Option<i32>,
        detail: &str,
    ) {
        error!(
            event_type = "analysis_failed",
            sequencing_run_id = %inv.run_id,
            pipeline_name = %inv.pipeline.name,
            pipeline_version = %inv.pipeline.version,
            pipeline_command = %command_line,
            exit_code = ?exit_code,
            analysis_work_dir = %inv.work_dir.display(),
            output = %detail,
            "analysis failed"
        );
    }
}
