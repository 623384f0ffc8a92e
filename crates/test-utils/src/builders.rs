#![allow(dead_code)]

use std::path::{Path, PathBuf};

use runwatch::config::{
    ConfigFile, ConfigSection, DependencyRef, NotificationSection, ParameterBinding,
    PipelineConfig, RawConfigFile, RunnerSection,
};
use runwatch::errors::Result;
use runwatch::types::{OutputDirPolicy, PostAnalysisKind};

/// Builder for `ConfigFile` with every directory placed under one root.
///
/// Layout: `<root>/fastq`, `<root>/output`, `<root>/work`, and
/// `<root>/reports` once a report dir is requested.
pub struct ConfigFileBuilder {
    root: PathBuf,
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            config: RawConfigFile {
                config: ConfigSection {
                    fastq_by_run_dir: root.join("fastq"),
                    analysis_output_dir: root.join("output"),
                    analysis_work_dir: root.join("work"),
                    analysis_report_dir: None,
                    check_symlinks_complete: true,
                    output_dir_policy: OutputDirPolicy::PerPipeline,
                    analyze_runs_in_reverse_order: false,
                    scan_interval_seconds: 3600,
                    watch_fastq_dir: false,
                },
                notification: NotificationSection::default(),
                runner: RunnerSection::default(),
                pipelines: Vec::new(),
            },
            root,
        }
    }

    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.config.pipelines.push(pipeline);
        self
    }

    pub fn with_report_dir(mut self) -> Self {
        self.config.config.analysis_report_dir = Some(self.root.join("reports"));
        self
    }

    pub fn with_output_dir_policy(mut self, policy: OutputDirPolicy) -> Self {
        self.config.config.output_dir_policy = policy;
        self
    }

    pub fn in_reverse_order(mut self) -> Self {
        self.config.config.analyze_runs_in_reverse_order = true;
        self
    }

    pub fn without_symlink_check(mut self) -> Self {
        self.config.config.check_symlinks_complete = false;
        self
    }

    pub fn with_notifications(mut self, addresses: &[&str]) -> Self {
        self.config.notification = NotificationSection {
            send_notification_emails: true,
            notification_email_addresses: addresses.iter().map(|a| a.to_string()).collect(),
        };
        self
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.runner.cache_dir = dir.into();
        self
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

/// Builder for one `[[pipeline]]` entry.
pub struct PipelineConfigBuilder {
    pipeline: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            pipeline: PipelineConfig {
                name: name.to_string(),
                version: version.to_string(),
                parameters: Vec::new(),
                dependencies: Vec::new(),
                no_value_flags: Vec::new(),
                estimate_read_length: false,
                post_analysis: PostAnalysisKind::None,
            },
        }
    }

    /// Parameter with a literal value.
    pub fn param(mut self, name: &str, value: &str) -> Self {
        self.pipeline.parameters.push(ParameterBinding {
            name: name.to_string(),
            value: Some(value.to_string()),
        });
        self
    }

    /// Parameter filled from the run (or the derived output dir).
    pub fn run_param(mut self, name: &str) -> Self {
        self.pipeline.parameters.push(ParameterBinding {
            name: name.to_string(),
            value: None,
        });
        self
    }

    /// Valueless flag.
    pub fn flag(mut self, name: &str) -> Self {
        self.pipeline.no_value_flags.push(name.to_string());
        self.run_param(name)
    }

    pub fn depends_on(mut self, name: &str, version: &str) -> Self {
        self.pipeline.dependencies.push(DependencyRef {
            name: name.to_string(),
            version: version.to_string(),
        });
        self
    }

    pub fn estimate_read_length(mut self) -> Self {
        self.pipeline.estimate_read_length = true;
        self
    }

    pub fn transfer_results(mut self) -> Self {
        self.pipeline.post_analysis = PostAnalysisKind::TransferResults;
        self
    }

    pub fn build(self) -> PipelineConfig {
        self.pipeline
    }
}
