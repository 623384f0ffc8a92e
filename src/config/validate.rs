// src/config/validate.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::config::model::{ConfigFile, ConfigSection, RawConfigFile, RunnerSection};
use crate::errors::{Result, RunwatchError};
use crate::types::PostAnalysisKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = RunwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        let config = expand_config_paths(raw.config)?;
        let runner = expand_runner_paths(raw.runner)?;
        Ok(ConfigFile::new_unchecked(
            config,
            raw.notification,
            runner,
            raw.pipelines,
        ))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_pipelines(cfg)?;
    validate_global_config(cfg)?;
    validate_pipeline_names(cfg)?;
    validate_pipeline_dependencies(cfg)?;
    validate_dependency_graph(cfg)?;
    Ok(())
}

fn ensure_has_pipelines(cfg: &RawConfigFile) -> Result<()> {
    if cfg.pipelines.is_empty() {
        return Err(RunwatchError::ConfigError(
            "config must contain at least one [[pipeline]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.scan_interval_seconds == 0 {
        return Err(RunwatchError::ConfigError(
            "[config].scan_interval_seconds must be >= 1 (got 0)".to_string(),
        ));
    }

    if cfg.notification.send_notification_emails
        && cfg.notification.notification_email_addresses.is_empty()
    {
        return Err(RunwatchError::ConfigError(
            "[notification].send_notification_emails is true but no notification_email_addresses are set"
                .to_string(),
        ));
    }

    let wants_transfer = cfg
        .pipelines
        .iter()
        .any(|p| p.post_analysis == PostAnalysisKind::TransferResults);
    if wants_transfer && cfg.config.analysis_report_dir.is_none() {
        return Err(RunwatchError::ConfigError(
            "post_analysis = \"transfer_results\" requires [config].analysis_report_dir"
                .to_string(),
        ));
    }

    Ok(())
}

/// Pipeline names must look like `owner/name`; versions must be non-empty and
/// each name+version pair may only be configured once.
fn validate_pipeline_names(cfg: &RawConfigFile) -> Result<()> {
    let mut seen: HashMap<(&str, &str), usize> = HashMap::new();

    for (idx, pipeline) in cfg.pipelines.iter().enumerate() {
        check_pipeline_name(&pipeline.name)?;

        if pipeline.version.trim().is_empty() {
            return Err(RunwatchError::ConfigError(format!(
                "pipeline '{}' has an empty version",
                pipeline.name
            )));
        }

        for dep in pipeline.dependencies.iter() {
            check_pipeline_name(&dep.name)?;
            if dep.version.trim().is_empty() {
                return Err(RunwatchError::ConfigError(format!(
                    "pipeline '{}' declares dependency '{}' with an empty version",
                    pipeline.name, dep.name
                )));
            }
        }

        for binding in pipeline.parameters.iter() {
            if binding.name.trim().is_empty() || binding.name.starts_with('-') {
                return Err(RunwatchError::ConfigError(format!(
                    "pipeline '{}' has an invalid parameter name '{}'",
                    pipeline.name, binding.name
                )));
            }
        }

        let key = (pipeline.name.as_str(), pipeline.version.as_str());
        if let Some(prev) = seen.insert(key, idx) {
            return Err(RunwatchError::ConfigError(format!(
                "pipeline '{}' version '{}' is configured twice (entries {} and {})",
                pipeline.name, pipeline.version, prev, idx
            )));
        }
    }

    Ok(())
}

fn check_pipeline_name(name: &str) -> Result<()> {
    match name.split_once('/') {
        Some((owner, short)) if !owner.is_empty() && !short.is_empty() && !short.contains('/') => {
            Ok(())
        }
        _ => Err(RunwatchError::ConfigError(format!(
            "pipeline name '{}' must have the form 'owner/name'",
            name
        ))),
    }
}

/// Self-dependencies are rejected. Dependencies on pipelines that are not
/// configured here are allowed (another process may produce them); a
/// configured dependency that comes later in launch order is only warned
/// about, since it can still be satisfied on a later pass.
fn validate_pipeline_dependencies(cfg: &RawConfigFile) -> Result<()> {
    let positions: HashMap<(&str, &str), usize> = cfg
        .pipelines
        .iter()
        .enumerate()
        .map(|(idx, p)| ((p.name.as_str(), p.version.as_str()), idx))
        .collect();

    for (idx, pipeline) in cfg.pipelines.iter().enumerate() {
        for dep in pipeline.dependencies.iter() {
            if dep.name == pipeline.name && dep.version == pipeline.version {
                return Err(RunwatchError::ConfigError(format!(
                    "pipeline '{}' cannot depend on itself",
                    pipeline.name
                )));
            }

            match positions.get(&(dep.name.as_str(), dep.version.as_str())) {
                Some(&dep_idx) if dep_idx > idx => {
                    warn!(
                        pipeline = %pipeline.name,
                        dependency = %dep.name,
                        "dependency is configured after its dependant; it can only be satisfied on a later pass"
                    );
                }
                Some(_) => {}
                None => {
                    warn!(
                        pipeline = %pipeline.name,
                        dependency = %dep.name,
                        dependency_version = %dep.version,
                        "dependency is not configured here; expecting it to be produced externally"
                    );
                }
            }
        }
    }

    Ok(())
}

fn validate_dependency_graph(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dependency -> dependant, keyed on "name@version".
    let keys: Vec<String> = cfg
        .pipelines
        .iter()
        .map(|p| format!("{}@{}", p.name, p.version))
        .collect();

    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
    for key in keys.iter() {
        graph.add_node(key.as_str());
    }

    let dep_keys: Vec<(usize, String)> = cfg
        .pipelines
        .iter()
        .enumerate()
        .flat_map(|(idx, p)| {
            p.dependencies
                .iter()
                .map(move |d| (idx, format!("{}@{}", d.name, d.version)))
        })
        .collect();

    for (idx, dep_key) in dep_keys.iter() {
        // Only configured pipelines can participate in a cycle.
        if let Some(dep_node) = keys.iter().find(|k| *k == dep_key) {
            graph.add_edge(dep_node.as_str(), keys[*idx].as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(RunwatchError::ConfigError(format!(
            "dependency cycle detected involving pipeline '{}'",
            cycle.node_id()
        ))),
    }
}

fn expand_config_paths(mut section: ConfigSection) -> Result<ConfigSection> {
    section.fastq_by_run_dir = expand_path(&section.fastq_by_run_dir)?;
    section.analysis_output_dir = expand_path(&section.analysis_output_dir)?;
    section.analysis_work_dir = expand_path(&section.analysis_work_dir)?;
    section.analysis_report_dir = section
        .analysis_report_dir
        .as_deref()
        .map(expand_path)
        .transpose()?;
    Ok(section)
}

fn expand_runner_paths(mut runner: RunnerSection) -> Result<RunnerSection> {
    runner.cache_dir = expand_path(&runner.cache_dir)?;
    Ok(runner)
}

/// Expand `~` and environment variables in a configured path, then make it
/// absolute against the current directory.
fn expand_path(path: &Path) -> Result<PathBuf> {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).map_err(|e| {
        RunwatchError::ConfigError(format!("cannot expand path {:?}: {}", path, e))
    })?;
    std::path::absolute(expanded.as_ref()).map_err(|e| {
        RunwatchError::ConfigError(format!("cannot resolve path {:?}: {}", path, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml_src: &str) -> RawConfigFile {
        toml::from_str(toml_src).expect("test TOML should parse")
    }

    const HEADER: &str = r#"
[config]
fastq_by_run_dir = "/in"
analysis_output_dir = "/out"
analysis_work_dir = "/work"
"#;

    #[test]
    fn accepts_minimal_config_with_defaults() {
        let src = format!(
            "{HEADER}\n[[pipeline]]\nname = \"BCCDC-PHL/mlst-nf\"\nversion = \"v0.1.3\"\n"
        );
        let cfg = ConfigFile::try_from(raw(&src)).unwrap();
        assert!(cfg.config().check_symlinks_complete);
        assert_eq!(cfg.config().scan_interval_seconds, 3600);
        assert_eq!(cfg.runner().program, "nextflow");
        assert!(cfg.notification_recipients().is_none());
    }

    #[test]
    fn relative_directories_are_made_absolute() {
        let src = r#"
[config]
fastq_by_run_dir = "relroot/fastq"
analysis_output_dir = "relroot/output"
analysis_work_dir = "./relroot/work"
analysis_report_dir = "relroot/reports"

[runner]
cache_dir = "relroot/cache"

[[pipeline]]
name = "org/a"
version = "v1.0.0"
"#;
        let cfg = ConfigFile::try_from(raw(src)).unwrap();
        let cwd = std::env::current_dir().unwrap();
        let section = cfg.config();
        assert_eq!(section.analysis_output_dir, cwd.join("relroot/output"));
        assert!(section.fastq_by_run_dir.is_absolute());
        assert!(section.analysis_work_dir.is_absolute());
        assert!(section.analysis_work_dir.ends_with("relroot/work"));
        assert!(section.analysis_report_dir.as_ref().unwrap().is_absolute());
        assert!(cfg.runner().cache_dir.is_absolute());
    }

    #[test]
    fn rejects_name_without_owner() {
        let src = format!("{HEADER}\n[[pipeline]]\nname = \"mlst-nf\"\nversion = \"v1\"\n");
        match ConfigFile::try_from(raw(&src)) {
            Err(RunwatchError::ConfigError(msg)) => assert!(msg.contains("owner/name")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn rejects_dependency_cycle_between_configured_pipelines() {
        let src = format!(
            r#"{HEADER}
[[pipeline]]
name = "org/a"
version = "v1.0.0"
[[pipeline.dependency]]
name = "org/b"
version = "v1.0.0"

[[pipeline]]
name = "org/b"
version = "v1.0.0"
[[pipeline.dependency]]
name = "org/a"
version = "v1.0.0"
"#
        );
        match ConfigFile::try_from(raw(&src)) {
            Err(RunwatchError::ConfigError(msg)) => assert!(msg.contains("cycle")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn allows_dependency_on_unconfigured_pipeline() {
        let src = format!(
            r#"{HEADER}
[[pipeline]]
name = "org/a"
version = "v1.0.0"
[[pipeline.dependency]]
name = "org/elsewhere"
version = "v2.1.0"
"#
        );
        assert!(ConfigFile::try_from(raw(&src)).is_ok());
    }

    #[test]
    fn notification_without_recipients_is_rejected() {
        let src = format!(
            "{HEADER}\n[notification]\nsend_notification_emails = true\n\n[[pipeline]]\nname = \"org/a\"\nversion = \"v1\"\n"
        );
        assert!(matches!(
            ConfigFile::try_from(raw(&src)),
            Err(RunwatchError::ConfigError(_))
        ));
    }

    #[test]
    fn transfer_hook_requires_report_dir() {
        let src = format!(
            "{HEADER}\n[[pipeline]]\nname = \"org/hcv-nf\"\nversion = \"v0.2.1\"\npost_analysis = \"transfer_results\"\n"
        );
        assert!(matches!(
            ConfigFile::try_from(raw(&src)),
            Err(RunwatchError::ConfigError(_))
        ));
    }
}
