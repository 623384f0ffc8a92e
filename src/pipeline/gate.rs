// src/pipeline/gate.rs

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;

use crate::exec::marker::marker_path;
use crate::fs::FileSystem;
use crate::pipeline::spec::PipelineSpec;

/// Completion state of one dependency edge, computed fresh on every check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyRecord {
    pub pipeline_name: String,
    pub pipeline_version: String,
    pub analysis_complete_path: PathBuf,
    pub analysis_complete: bool,
}

/// Result of checking every dependency of one pipeline for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GateCheck {
    pub records: Vec<DependencyRecord>,
}

impl GateCheck {
    /// True iff every dependency's marker is present. No dependencies means
    /// the gate is open.
    pub fn all_complete(&self) -> bool {
        self.records.iter().all(|r| r.analysis_complete)
    }

    pub fn records_json(&self) -> String {
        serde_json::to_string(&self.records).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Checks upstream completion markers on disk.
///
/// Deliberately stateless: dependencies may complete (in this process or
/// another) between checks, so nothing is remembered across calls.
#[derive(Debug, Clone, Copy)]
pub struct DependencyGate<'a> {
    fs: &'a dyn FileSystem,
}

impl<'a> DependencyGate<'a> {
    pub fn new(fs: &'a dyn FileSystem) -> Self {
        Self { fs }
    }

    /// Inspect the marker of every dependency of `spec` under
    /// `run_output_dir`.
    pub fn check(&self, spec: &PipelineSpec, run_output_dir: &Path) -> GateCheck {
        if spec.dependencies.is_empty() {
            return GateCheck::default();
        }

        let records: Vec<DependencyRecord> = spec
            .dependencies
            .iter()
            .map(|dep| {
                let path = marker_path(&dep.output_dir(run_output_dir));
                DependencyRecord {
                    pipeline_name: dep.name.clone(),
                    pipeline_version: dep.version.clone(),
                    analysis_complete: self.fs.is_file(&path),
                    analysis_complete_path: path,
                }
            })
            .collect();

        let check = GateCheck { records };

        info!(
            event_type = "checked_analysis_dependencies",
            pipeline_name = %spec.name(),
            all_analysis_dependencies_complete = check.all_complete(),
            analysis_dependencies = %check.records_json(),
            "checked analysis dependencies"
        );

        check
    }

    pub fn all_dependencies_complete(&self, spec: &PipelineSpec, run_output_dir: &Path) -> bool {
        self.check(spec, run_output_dir).all_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DependencyRef, PipelineConfig};
    use crate::fs::mock::MockFileSystem;
    use crate::types::PostAnalysisKind;

    fn spec_with_deps(deps: &[(&str, &str)]) -> PipelineSpec {
        PipelineSpec::from_config(&PipelineConfig {
            name: "org/downstream".into(),
            version: "v1.0.0".into(),
            parameters: vec![],
            dependencies: deps
                .iter()
                .map(|(n, v)| DependencyRef {
                    name: n.to_string(),
                    version: v.to_string(),
                })
                .collect(),
            no_value_flags: vec![],
            estimate_read_length: false,
            post_analysis: PostAnalysisKind::None,
        })
    }

    #[test]
    fn no_dependencies_is_open() {
        let fs = MockFileSystem::new();
        let gate = DependencyGate::new(&fs);
        assert!(gate.all_dependencies_complete(&spec_with_deps(&[]), Path::new("/out/run")));
    }

    #[test]
    fn open_only_when_every_marker_exists() {
        let fs = MockFileSystem::new();
        let gate = DependencyGate::new(&fs);
        let spec = spec_with_deps(&[("org/a", "v0.1.2"), ("org/b", "v2.0.0")]);
        let run_out = Path::new("/out/run");

        fs.add_file("/out/run/a-v0.1-output/analysis_complete.json", b"{}".to_vec());
        let check = gate.check(&spec, run_out);
        assert!(!check.all_complete());
        assert!(check.records[0].analysis_complete);
        assert!(!check.records[1].analysis_complete);

        fs.add_file("/out/run/b-v2.0-output/analysis_complete.json", b"{}".to_vec());
        assert!(gate.all_dependencies_complete(&spec, run_out));
    }

    #[test]
    fn output_dir_without_marker_does_not_count() {
        let fs = MockFileSystem::new();
        fs.add_file("/out/run/a-v0.1-output/partial.txt", b"x".to_vec());
        let gate = DependencyGate::new(&fs);
        let spec = spec_with_deps(&[("org/a", "v0.1.2")]);
        assert!(!gate.all_dependencies_complete(&spec, Path::new("/out/run")));
    }
}
