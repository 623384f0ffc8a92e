// src/engine/hooks.rs

//! Post-analysis hooks, run after a pipeline reaches COMPLETED.
//!
//! Hooks never change the pipeline's state: every problem is logged and the
//! pass moves on.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::ConfigFile;
use crate::fs::FileSystem;
use crate::pipeline::PipelineSpec;
use crate::types::PostAnalysisKind;

pub const TRANSFER_COMPLETE_FILE: &str = "transfer_complete.json";

const TRANSFER_DIR_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// One per-sample file to copy. `{}` in the template is replaced with the
/// sample name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleFile {
    pub template: &'static str,
    /// Depth plots are written with `-` replaced by `o` in the sample name.
    pub dash_to_o: bool,
}

impl SampleFile {
    pub fn file_name(&self, sample: &str) -> String {
        let name = if self.dash_to_o {
            sample.replace('-', "o")
        } else {
            sample.to_string()
        };
        self.template.replace("{}", &name)
    }
}

pub const DEFAULT_SAMPLE_FILES: &[SampleFile] = &[
    SampleFile { template: "{}_depth_plots.png", dash_to_o: true },
    SampleFile { template: "RAxML_bestTree.{}_core", dash_to_o: false },
    SampleFile { template: "RAxML_bestTree.{}_ns5b", dash_to_o: false },
    SampleFile { template: "{}_genotype_calls_nt.csv", dash_to_o: false },
    SampleFile { template: "{}_consensus_seqs.fa", dash_to_o: false },
];

/// Where transferred results go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    pub report_dir: PathBuf,
    pub sample_files: Vec<SampleFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferComplete {
    pub timestamp_transfer_start: DateTime<Local>,
    pub timestamp_transfer_complete: DateTime<Local>,
}

/// What the transfer hook did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred { destination: PathBuf, missing: Vec<PathBuf> },
    AlreadyComplete { destination: PathBuf },
    DestinationIncomplete { destination: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostAnalysisHook {
    NoOp,
    TransferResults(TransferSpec),
}

/// Identifies the finished (run, pipeline) a hook runs for.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    pub run_id: &'a str,
    pub spec: &'a PipelineSpec,
    pub output_dir: &'a Path,
    pub now: DateTime<Local>,
}

impl PostAnalysisHook {
    pub fn run(&self, fs: &dyn FileSystem, ctx: &HookContext<'_>) {
        match self {
            PostAnalysisHook::NoOp => {
                info!(
                    event_type = "post_analysis_not_implemented",
                    sequencing_run_id = %ctx.run_id,
                    pipeline_name = %ctx.spec.name(),
                    "no post-analysis step for pipeline"
                );
            }
            PostAnalysisHook::TransferResults(spec) => {
                info!(
                    event_type = "post_analysis_started",
                    sequencing_run_id = %ctx.run_id,
                    pipeline_name = %ctx.spec.name(),
                    "running post-analysis result transfer"
                );
                if let Err(err) = transfer_results(fs, spec, ctx) {
                    error!(
                        event_type = "transfer_results_failed",
                        sequencing_run_id = %ctx.run_id,
                        pipeline_name = %ctx.spec.name(),
                        error = %format!("{err:#}"),
                        "result transfer failed"
                    );
                }
            }
        }
    }
}

static NO_OP: PostAnalysisHook = PostAnalysisHook::NoOp;

/// Maps pipeline name to its hook. Unregistered pipelines get
/// [`PostAnalysisHook::NoOp`].
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<String, PostAnalysisHook>,
}

impl HookRegistry {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let mut hooks = HashMap::new();
        for p in cfg.pipelines() {
            if p.post_analysis != PostAnalysisKind::TransferResults {
                continue;
            }
            // Validation guarantees a report dir for transfer hooks.
            if let Some(report_dir) = &cfg.config().analysis_report_dir {
                hooks.insert(
                    p.name.clone(),
                    PostAnalysisHook::TransferResults(TransferSpec {
                        report_dir: report_dir.clone(),
                        sample_files: DEFAULT_SAMPLE_FILES.to_vec(),
                    }),
                );
            }
        }
        Self { hooks }
    }

    pub fn register(&mut self, pipeline_name: impl Into<String>, hook: PostAnalysisHook) {
        self.hooks.insert(pipeline_name.into(), hook);
    }

    pub fn hook_for(&self, pipeline_name: &str) -> &PostAnalysisHook {
        self.hooks.get(pipeline_name).unwrap_or(&NO_OP)
    }
}

/// Copy the run summary and per-sample result files into a timestamped
/// directory under the report area.
///
/// Skips when an earlier transfer for this run already completed, or when the
/// destination directory exists without a completion file.
pub fn transfer_results(
    fs: &dyn FileSystem,
    spec: &TransferSpec,
    ctx: &HookContext<'_>,
) -> Result<TransferOutcome> {
    let run_report_dir = spec
        .report_dir
        .join(ctx.spec.output_dir_name())
        .join(ctx.run_id);
    let destination = run_report_dir.join(ctx.now.format(TRANSFER_DIR_TIMESTAMP_FORMAT).to_string());

    if let Some(done) = completed_transfer(fs, &run_report_dir)? {
        warn!(
            event_type = "transfer_folder_exists_complete",
            sequencing_run_id = %ctx.run_id,
            pipeline_name = %ctx.spec.name(),
            transfer_dir = %done.display(),
            "results already transferred"
        );
        return Ok(TransferOutcome::AlreadyComplete { destination: done });
    }
    if fs.exists(&destination) {
        error!(
            event_type = "transfer_folder_exists_incomplete",
            sequencing_run_id = %ctx.run_id,
            pipeline_name = %ctx.spec.name(),
            transfer_dir = %destination.display(),
            "transfer destination exists without completion file"
        );
        return Ok(TransferOutcome::DestinationIncomplete { destination });
    }

    let started = Local::now();
    info!(
        event_type = "transfer_results_start",
        sequencing_run_id = %ctx.run_id,
        pipeline_name = %ctx.spec.name(),
        transfer_dir = %destination.display(),
        "transferring results"
    );

    fs.create_dir_all(&destination)?;
    let mut missing = Vec::new();

    let summary = format!("{}_run_summary_report.csv", ctx.run_id);
    copy_if_present(fs, &ctx.output_dir.join(&summary), &destination.join(&summary), &mut missing)?;

    for sample_src in fs.read_dir(ctx.output_dir)? {
        if !fs.is_dir(&sample_src) {
            continue;
        }
        let Some(sample) = sample_src.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            continue;
        };
        let sample_dest = destination.join(&sample);
        fs.create_dir_all(&sample_dest)?;

        for file in &spec.sample_files {
            let name = file.file_name(&sample);
            copy_if_present(fs, &sample_src.join(&name), &sample_dest.join(&name), &mut missing)?;
        }
    }

    let record = TransferComplete {
        timestamp_transfer_start: started,
        timestamp_transfer_complete: Local::now(),
    };
    let body = serde_json::to_string_pretty(&record).context("serializing transfer record")?;
    fs.write(&destination.join(TRANSFER_COMPLETE_FILE), body.as_bytes())?;

    info!(
        event_type = "transfer_results_complete",
        sequencing_run_id = %ctx.run_id,
        pipeline_name = %ctx.spec.name(),
        transfer_dir = %destination.display(),
        missing_files = missing.len(),
        "results transferred"
    );

    Ok(TransferOutcome::Transferred { destination, missing })
}

fn completed_transfer(fs: &dyn FileSystem, run_report_dir: &Path) -> Result<Option<PathBuf>> {
    if !fs.is_dir(run_report_dir) {
        return Ok(None);
    }
    Ok(fs
        .read_dir(run_report_dir)?
        .into_iter()
        .find(|dir| fs.is_file(&dir.join(TRANSFER_COMPLETE_FILE))))
}

fn copy_if_present(
    fs: &dyn FileSystem,
    from: &Path,
    to: &Path,
    missing: &mut Vec<PathBuf>,
) -> Result<()> {
    if !fs.is_file(from) {
        warn!(
            event_type = "transfer_file_does_not_exist",
            file = %from.display(),
            "file to transfer does not exist"
        );
        missing.push(from.to_path_buf());
        return Ok(());
    }
    debug!(from = %from.display(), to = %to.display(), "copying result file");
    fs.copy(from, to)
}
