// src/exec/command.rs

//! Turns a pipeline spec plus a discovered run into a concrete runner
//! invocation.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::error;

use crate::config::ConfigFile;
use crate::discovery::RunDescriptor;
use crate::errors::{Result, RunwatchError};
use crate::fastq;
use crate::fs::FileSystem;
use crate::pipeline::{minor_version, PipelineRef, PipelineSpec};

pub const OUTDIR_PARAMETER: &str = "outdir";
pub const READ_LENGTH_PARAMETER: &str = "read_length";

const WORK_DIR_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Everything needed to launch, clean up after, and report on one attempt.
///
/// The launch timestamp is fixed here, so the work directory name is known up
/// front and never has to be rediscovered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineInvocation {
    pub run_id: String,
    pub pipeline: PipelineRef,
    pub program: String,
    pub args: Vec<String>,
    pub output_dir: PathBuf,
    pub work_dir: PathBuf,
    pub log_path: PathBuf,
    pub report_path: PathBuf,
    pub trace_path: PathBuf,
    pub timeline_path: PathBuf,
    pub launched_at: DateTime<Local>,
}

impl PipelineInvocation {
    /// Space-joined command line, for logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Value following `--<name>` in the argument list, if any.
    pub fn parameter_value(&self, name: &str) -> Option<&str> {
        let flag = format!("--{name}");
        let pos = self.args.iter().position(|a| *a == flag)?;
        self.args
            .get(pos + 1)
            .filter(|v| !v.starts_with("--"))
            .map(String::as_str)
    }
}

/// A resolved `--name [value]` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedParam {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    fs: &'a dyn FileSystem,
    config: &'a ConfigFile,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(fs: &'a dyn FileSystem, config: &'a ConfigFile) -> Self {
        Self { fs, config }
    }

    /// Output directory of `spec` for `run`.
    pub fn output_dir(&self, spec: &PipelineSpec, run_id: &str) -> PathBuf {
        spec.output_dir(&self.config.config().analysis_output_dir.join(run_id))
    }

    pub fn build(
        &self,
        spec: &PipelineSpec,
        run: &RunDescriptor,
        launched_at: DateTime<Local>,
    ) -> Result<PipelineInvocation> {
        let output_dir = self.output_dir(spec, &run.run_id);
        let prefix = format!("{}_{}", run.run_id, spec.short_name());
        let artifact = |suffix: &str| output_dir.join(format!("{prefix}_{suffix}"));

        // Unique per (run, pipeline, minor version, second).
        let work_dir = self.config.config().analysis_work_dir.join(format!(
            "work-{prefix}-{}_{}",
            minor_version(spec.version()),
            launched_at.format(WORK_DIR_TIMESTAMP_FORMAT)
        ));
        let log_path = artifact("nextflow.log");
        let report_path = artifact("report.html");
        let trace_path = artifact("trace.tsv");
        let timeline_path = artifact("timeline.html");

        let read_length = if spec.estimate_read_length {
            Some(self.estimate_read_length(spec, run)?)
        } else {
            None
        };
        let params = self.resolve_parameters(spec, run, &output_dir, read_length)?;

        let runner = self.config.runner();
        let mut args: Vec<String> = vec![
            "-log".into(),
            path_arg(&log_path),
            "run".into(),
            spec.name().to_string(),
            "-r".into(),
            spec.version().to_string(),
            "-profile".into(),
            runner.profile.clone(),
            "--cache".into(),
            path_arg(&runner.cache_dir),
            "-work-dir".into(),
            path_arg(&work_dir),
            "-with-report".into(),
            path_arg(&report_path),
            "-with-trace".into(),
            path_arg(&trace_path),
            "-with-timeline".into(),
            path_arg(&timeline_path),
        ];

        if let Some(recipients) = self.config.notification_recipients() {
            if !recipients.is_empty() {
                args.push("-with-notification".into());
                args.push(recipients.join(","));
            }
        }

        for param in params {
            args.push(format!("--{}", param.name));
            if let Some(value) = param.value {
                args.push(value);
            }
        }

        Ok(PipelineInvocation {
            run_id: run.run_id.clone(),
            pipeline: spec.pipeline.clone(),
            program: runner.program.clone(),
            args,
            output_dir,
            work_dir,
            log_path,
            report_path,
            trace_path,
            timeline_path,
            launched_at,
        })
    }

    /// Literal value, then no-value flag, then run parameter. Anything left
    /// unresolved fails this (run, pipeline) pair.
    fn resolve_parameters(
        &self,
        spec: &PipelineSpec,
        run: &RunDescriptor,
        output_dir: &Path,
        read_length: Option<u32>,
    ) -> Result<Vec<ResolvedParam>> {
        let mut resolved = Vec::with_capacity(spec.parameters.len() + 2);
        let mut saw_outdir = false;
        let mut saw_read_length = false;

        for binding in &spec.parameters {
            let name = binding.name.as_str();
            let value = if name == OUTDIR_PARAMETER {
                saw_outdir = true;
                Some(path_arg(output_dir))
            } else if name == READ_LENGTH_PARAMETER && read_length.is_some() {
                saw_read_length = true;
                read_length.map(|n| n.to_string())
            } else if let Some(literal) = &binding.value {
                Some(literal.clone())
            } else if spec.is_no_value_flag(name) {
                None
            } else {
                let value = run.parameter(name).ok_or_else(|| {
                    RunwatchError::ParameterResolution {
                        pipeline: spec.name().to_string(),
                        parameter: name.to_string(),
                        reason: format!("run {} provides no value for it", run.run_id),
                    }
                })?;
                Some(value.to_string())
            };
            resolved.push(ResolvedParam {
                name: name.to_string(),
                value,
            });
        }

        if !saw_outdir {
            resolved.push(ResolvedParam {
                name: OUTDIR_PARAMETER.to_string(),
                value: Some(path_arg(output_dir)),
            });
        }
        if let (Some(n), false) = (read_length, saw_read_length) {
            resolved.push(ResolvedParam {
                name: READ_LENGTH_PARAMETER.to_string(),
                value: Some(n.to_string()),
            });
        }

        Ok(resolved)
    }

    fn estimate_read_length(&self, spec: &PipelineSpec, run: &RunDescriptor) -> Result<u32> {
        let fail = |reason: String| RunwatchError::ParameterResolution {
            pipeline: spec.name().to_string(),
            parameter: READ_LENGTH_PARAMETER.to_string(),
            reason,
        };

        match fastq::sample_read_length(self.fs, &run.fastq_directory) {
            Ok(Some(n)) => Ok(n),
            Ok(None) => {
                error!(
                    event_type = "find_fastq_files_failed",
                    sequencing_run_id = %run.run_id,
                    fastq_directory = %run.fastq_directory.display(),
                    pipeline_name = %spec.name(),
                    "no FASTQ files found for read length estimate"
                );
                Err(fail(format!(
                    "no FASTQ files in {}",
                    run.fastq_directory.display()
                )))
            }
            Err(err) => {
                error!(
                    event_type = "find_fastq_files_failed",
                    sequencing_run_id = %run.run_id,
                    fastq_directory = %run.fastq_directory.display(),
                    pipeline_name = %spec.name(),
                    error = %err,
                    "failed to sample FASTQ reads for read length estimate"
                );
                Err(fail(format!("{err:#}")))
            }
        }
    }
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
