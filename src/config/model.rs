// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::types::{OutputDirPolicy, PostAnalysisKind};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// fastq_by_run_dir = "/data/fastq_symlinks_by_run"
/// analysis_output_dir = "/data/analysis_by_run"
/// analysis_work_dir = "/scratch/runwatch-work"
///
/// [[pipeline]]
/// name = "BCCDC-PHL/taxon-abundance"
/// version = "v0.1.5"
///
/// [[pipeline.parameter]]
/// name = "fastq_input"
/// ```
///
/// Use `ConfigFile::try_from(raw)` to obtain a validated config.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Directory layout and scan behaviour from `[config]`.
    pub config: ConfigSection,

    #[serde(default)]
    pub notification: NotificationSection,

    #[serde(default)]
    pub runner: RunnerSection,

    /// All `[[pipeline]]` entries, in launch order.
    #[serde(default, rename = "pipeline")]
    pub pipelines: Vec<PipelineConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Root directory whose immediate subdirectories are candidate runs.
    pub fastq_by_run_dir: PathBuf,

    /// Root of the per-run analysis output tree.
    pub analysis_output_dir: PathBuf,

    /// Root under which per-attempt work directories are created.
    pub analysis_work_dir: PathBuf,

    /// Reporting area used by post-analysis hooks.
    #[serde(default)]
    pub analysis_report_dir: Option<PathBuf>,

    /// Require `symlinks_complete.json` inside a run dir before analysing it.
    #[serde(default = "default_true")]
    pub check_symlinks_complete: bool,

    #[serde(default)]
    pub output_dir_policy: OutputDirPolicy,

    /// Visit run directories newest-first (reverse lexical order).
    #[serde(default)]
    pub analyze_runs_in_reverse_order: bool,

    /// Seconds to wait between scan passes in daemon mode.
    #[serde(default = "default_scan_interval_seconds")]
    pub scan_interval_seconds: u64,

    /// Wake the daemon loop early on filesystem events under
    /// `fastq_by_run_dir`.
    #[serde(default)]
    pub watch_fastq_dir: bool,
}

fn default_true() -> bool {
    true
}

fn default_scan_interval_seconds() -> u64 {
    3600
}

/// `[notification]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct NotificationSection {
    #[serde(default)]
    pub send_notification_emails: bool,

    #[serde(default)]
    pub notification_email_addresses: Vec<String>,
}

/// `[runner]` section: the fixed part of every external pipeline invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerSection {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_profile")]
    pub profile: String,

    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

fn default_program() -> String {
    "nextflow".to_string()
}

fn default_profile() -> String {
    "conda".to_string()
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("~/.conda/envs")
}

impl Default for RunnerSection {
    fn default() -> Self {
        Self {
            program: default_program(),
            profile: default_profile(),
            cache_dir: default_cache_dir(),
        }
    }
}

/// `[[pipeline]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Full pipeline name in `owner/name` form.
    pub name: String,

    /// Version pin passed to the runner (e.g. `v0.1.5`).
    pub version: String,

    /// Ordered `[[pipeline.parameter]]` bindings.
    #[serde(default, rename = "parameter")]
    pub parameters: Vec<ParameterBinding>,

    /// Upstream pipelines that must have completed for the same run.
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DependencyRef>,

    /// Parameters emitted as a bare `--flag` when they have no value.
    #[serde(default)]
    pub no_value_flags: Vec<String>,

    /// Derive a `read_length` parameter from the run's first FASTQ file.
    #[serde(default)]
    pub estimate_read_length: bool,

    #[serde(default)]
    pub post_analysis: PostAnalysisKind,
}

/// One CLI parameter binding.
///
/// With a `value` the literal is passed through. Without one the parameter is
/// either a no-value flag or resolved from the run being analysed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParameterBinding {
    pub name: String,

    #[serde(default)]
    pub value: Option<String>,
}

/// Reference to an upstream pipeline by name and version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DependencyRef {
    pub name: String,
    pub version: String,
}

/// Validated configuration.
///
/// Only constructible through `TryFrom<RawConfigFile>`, so holders can rely on
/// every invariant checked in `config::validate`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    notification: NotificationSection,
    runner: RunnerSection,
    pipelines: Vec<PipelineConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        notification: NotificationSection,
        runner: RunnerSection,
        pipelines: Vec<PipelineConfig>,
    ) -> Self {
        Self {
            config,
            notification,
            runner,
            pipelines,
        }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn notification(&self) -> &NotificationSection {
        &self.notification
    }

    pub fn runner(&self) -> &RunnerSection {
        &self.runner
    }

    pub fn pipelines(&self) -> &[PipelineConfig] {
        &self.pipelines
    }

    /// Recipients to pass to the runner, or `None` when notifications are off.
    pub fn notification_recipients(&self) -> Option<&[String]> {
        if self.notification.send_notification_emails {
            Some(&self.notification.notification_email_addresses)
        } else {
            None
        }
    }
}
