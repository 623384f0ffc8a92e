// src/pipeline/spec.rs

use std::path::{Path, PathBuf};

use crate::config::{ConfigFile, ParameterBinding, PipelineConfig};
use crate::types::PostAnalysisKind;

/// Part of a pipeline name after the owner, e.g. `mlst-nf` for
/// `BCCDC-PHL/mlst-nf`.
pub fn short_name(name: &str) -> &str {
    name.split_once('/').map(|(_, short)| short).unwrap_or(name)
}

/// Version with its final dot-separated component stripped: `v0.1.5` -> `v0.1`.
/// A version without a dot is returned unchanged.
pub fn minor_version(version: &str) -> &str {
    version
        .rsplit_once('.')
        .map(|(head, _)| head)
        .unwrap_or(version)
}

/// `{short_name}-{minor_version}-output`.
///
/// Patch releases of a pipeline share an output directory, so a patch bump
/// does not re-trigger analysis of runs that are already done.
pub fn output_dir_name(name: &str, version: &str) -> String {
    format!("{}-{}-output", short_name(name), minor_version(version))
}

/// A pipeline identified by name and version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PipelineRef {
    pub name: String,
    pub version: String,
}

impl PipelineRef {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn short_name(&self) -> &str {
        short_name(&self.name)
    }

    pub fn output_dir_name(&self) -> String {
        output_dir_name(&self.name, &self.version)
    }

    /// This pipeline's output directory for one run.
    pub fn output_dir(&self, run_output_dir: &Path) -> PathBuf {
        run_output_dir.join(self.output_dir_name())
    }
}

/// Read-only description of one configured pipeline.
#[derive(Debug, Clone)]
pub struct PipelineSpec {
    pub pipeline: PipelineRef,
    pub parameters: Vec<ParameterBinding>,
    pub dependencies: Vec<PipelineRef>,
    pub no_value_flags: Vec<String>,
    pub estimate_read_length: bool,
    pub post_analysis: PostAnalysisKind,
}

impl PipelineSpec {
    pub fn from_config(cfg: &PipelineConfig) -> Self {
        Self {
            pipeline: PipelineRef::new(&cfg.name, &cfg.version),
            parameters: cfg.parameters.clone(),
            dependencies: cfg
                .dependencies
                .iter()
                .map(|d| PipelineRef::new(&d.name, &d.version))
                .collect(),
            no_value_flags: cfg.no_value_flags.clone(),
            estimate_read_length: cfg.estimate_read_length,
            post_analysis: cfg.post_analysis,
        }
    }

    /// All pipeline specs from a validated config, in launch order.
    pub fn all_from_config(cfg: &ConfigFile) -> Vec<Self> {
        cfg.pipelines().iter().map(Self::from_config).collect()
    }

    pub fn name(&self) -> &str {
        &self.pipeline.name
    }

    pub fn version(&self) -> &str {
        &self.pipeline.version
    }

    pub fn short_name(&self) -> &str {
        self.pipeline.short_name()
    }

    pub fn output_dir_name(&self) -> String {
        self.pipeline.output_dir_name()
    }

    pub fn output_dir(&self, run_output_dir: &Path) -> PathBuf {
        self.pipeline.output_dir(run_output_dir)
    }

    pub fn is_no_value_flag(&self, parameter: &str) -> bool {
        self.no_value_flags.iter().any(|f| f == parameter)
    }
}
