// src/discovery/scanner.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info};

use crate::config::ConfigFile;
use crate::discovery::run_id::RunIdMatcher;
use crate::fs::FileSystem;
use crate::types::{Conditions, OutputDirPolicy, ScanOrder};

/// Presence-only file written by the upstream staging step once all FASTQ
/// symlinks for a run are in place.
pub const READY_SENTINEL_FILE: &str = "symlinks_complete.json";

/// A run directory that passed classification.
///
/// Immutable once yielded; consumed by the orchestrator for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunDescriptor {
    pub run_id: String,
    /// Absolute path to the run's FASTQ directory.
    pub fastq_directory: PathBuf,
    /// Values pipelines may pull in by parameter name. `None` means unset.
    pub analysis_parameters: BTreeMap<String, Option<String>>,
}

impl RunDescriptor {
    pub fn new(run_id: impl Into<String>, fastq_directory: impl Into<PathBuf>) -> Self {
        let run_id = run_id.into();
        let fastq_directory = fastq_directory.into();

        let mut analysis_parameters = BTreeMap::new();
        analysis_parameters.insert(
            "fastq_input".to_string(),
            Some(fastq_directory.to_string_lossy().into_owned()),
        );
        analysis_parameters.insert("prefix".to_string(), Some(run_id.clone()));

        Self {
            run_id,
            fastq_directory,
            analysis_parameters,
        }
    }

    /// Look up a run-derived parameter value.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.analysis_parameters
            .get(name)
            .and_then(|v| v.as_deref())
    }
}

/// A directory that did not qualify, with the predicate results that say why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDirectory {
    pub path: PathBuf,
    pub conditions: Conditions,
}

/// One classification result. Every subdirectory produces exactly one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryItem {
    Run(RunDescriptor),
    Skipped(SkippedDirectory),
}

impl DiscoveryItem {
    pub fn as_run(&self) -> Option<&RunDescriptor> {
        match self {
            DiscoveryItem::Run(run) => Some(run),
            DiscoveryItem::Skipped(_) => None,
        }
    }
}

/// The subset of config that discovery needs.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    pub fastq_by_run_dir: PathBuf,
    pub analysis_output_dir: PathBuf,
    pub check_symlinks_complete: bool,
    pub output_dir_policy: OutputDirPolicy,
    pub order: ScanOrder,
}

impl DiscoveryOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        let section = cfg.config();
        Self {
            fastq_by_run_dir: section.fastq_by_run_dir.clone(),
            analysis_output_dir: section.analysis_output_dir.clone(),
            check_symlinks_complete: section.check_symlinks_complete,
            output_dir_policy: section.output_dir_policy,
            order: ScanOrder::from_reverse_flag(section.analyze_runs_in_reverse_order),
        }
    }
}

/// Lazy sequence of classification results for one scan.
///
/// The directory listing is taken up front; each entry is classified only
/// when the iterator reaches it, so state checked for later runs reflects
/// whatever earlier runs' pipelines did in the meantime.
pub struct RunScan<'a> {
    fs: &'a dyn FileSystem,
    options: &'a DiscoveryOptions,
    matcher: &'a RunIdMatcher,
    entries: std::vec::IntoIter<PathBuf>,
}

impl std::fmt::Debug for RunScan<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunScan")
            .field("options", &self.options)
            .field("remaining", &self.entries.len())
            .finish()
    }
}

/// Start a scan of `options.fastq_by_run_dir`.
///
/// Fails only if the root itself cannot be listed.
pub fn scan<'a>(
    fs: &'a dyn FileSystem,
    options: &'a DiscoveryOptions,
    matcher: &'a RunIdMatcher,
) -> Result<RunScan<'a>> {
    info!(
        event_type = "scan_start",
        fastq_by_run_dir = %options.fastq_by_run_dir.display(),
        "scan started"
    );

    let mut entries = fs.read_dir(&options.fastq_by_run_dir)?;
    if options.order == ScanOrder::ReverseLexical {
        entries.sort_by(|a, b| b.file_name().cmp(&a.file_name()));
    }

    Ok(RunScan {
        fs,
        options,
        matcher,
        entries: entries.into_iter(),
    })
}

impl Iterator for RunScan<'_> {
    type Item = DiscoveryItem;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.entries.next()?;
        Some(classify(self.fs, self.options, self.matcher, path))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.entries.size_hint()
    }
}

fn classify(
    fs: &dyn FileSystem,
    options: &DiscoveryOptions,
    matcher: &RunIdMatcher,
    path: PathBuf,
) -> DiscoveryItem {
    let run_id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let ready_to_analyze = if options.check_symlinks_complete {
        fs.exists(&path.join(READY_SENTINEL_FILE))
    } else {
        true
    };

    let mut conditions = Conditions::new()
        .with("is_directory", fs.is_dir(&path))
        .with("matches_illumina_run_id_format", matcher.is_match(&run_id))
        .with("ready_to_analyze", ready_to_analyze);

    if options.output_dir_policy == OutputDirPolicy::SkipExistingRun {
        let analysis_outdir = options.analysis_output_dir.join(&run_id);
        conditions = conditions.with("analysis_not_already_initiated", !fs.exists(&analysis_outdir));
    }

    if conditions.all_met() {
        info!(
            event_type = "fastq_directory_found",
            sequencing_run_id = %run_id,
            fastq_directory_path = %path.display(),
            "run directory found"
        );
        DiscoveryItem::Run(RunDescriptor::new(run_id, path))
    } else {
        debug!(
            event_type = "directory_skipped",
            fastq_directory_path = %path.display(),
            conditions_checked = %conditions.to_json(),
            "directory skipped"
        );
        DiscoveryItem::Skipped(SkippedDirectory { path, conditions })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    const MISEQ: &str = "240115_M01234_0123_000000000-ABCDE";
    const NEXTSEQ: &str = "240116_VH00123_45_AAAAAAAM5";

    fn options(policy: OutputDirPolicy, order: ScanOrder) -> DiscoveryOptions {
        DiscoveryOptions {
            fastq_by_run_dir: PathBuf::from("/fastq"),
            analysis_output_dir: PathBuf::from("/out"),
            check_symlinks_complete: true,
            output_dir_policy: policy,
            order,
        }
    }

    fn ready_run(fs: &MockFileSystem, run_id: &str) {
        fs.add_file(format!("/fastq/{run_id}/{READY_SENTINEL_FILE}"), b"{}".to_vec());
    }

    #[test]
    fn every_entry_is_reported_once() {
        let fs = MockFileSystem::new();
        ready_run(&fs, MISEQ);
        fs.add_dir("/fastq/not-a-run");
        fs.add_file("/fastq/notes.txt", b"hi".to_vec());

        let opts = options(OutputDirPolicy::PerPipeline, ScanOrder::Filesystem);
        let matcher = RunIdMatcher::new().unwrap();
        let items: Vec<_> = scan(&fs, &opts, &matcher).unwrap().collect();

        assert_eq!(items.len(), 3);
        assert_eq!(items.iter().filter_map(|i| i.as_run()).count(), 1);

        let not_a_run = items
            .iter()
            .find_map(|i| match i {
                DiscoveryItem::Skipped(s) if s.path.ends_with("not-a-run") => Some(s),
                _ => None,
            })
            .expect("not-a-run is reported as skipped");
        assert_eq!(not_a_run.conditions.get("is_directory"), Some(true));
        assert_eq!(
            not_a_run.conditions.get("matches_illumina_run_id_format"),
            Some(false)
        );
    }

    #[test]
    fn descriptor_carries_fastq_input_and_prefix() {
        let fs = MockFileSystem::new();
        ready_run(&fs, NEXTSEQ);

        let opts = options(OutputDirPolicy::PerPipeline, ScanOrder::Filesystem);
        let matcher = RunIdMatcher::new().unwrap();
        let item = scan(&fs, &opts, &matcher).unwrap().next().unwrap();
        let run = item.as_run().unwrap();

        assert_eq!(run.run_id, NEXTSEQ);
        assert_eq!(
            run.parameter("fastq_input"),
            Some(format!("/fastq/{NEXTSEQ}").as_str())
        );
        assert_eq!(run.parameter("prefix"), Some(NEXTSEQ));
    }

    #[test]
    fn missing_sentinel_is_skipped_with_reason() {
        let fs = MockFileSystem::new();
        fs.add_dir(format!("/fastq/{MISEQ}"));

        let opts = options(OutputDirPolicy::PerPipeline, ScanOrder::Filesystem);
        let matcher = RunIdMatcher::new().unwrap();
        match scan(&fs, &opts, &matcher).unwrap().next().unwrap() {
            DiscoveryItem::Skipped(s) => {
                assert_eq!(s.conditions.get("ready_to_analyze"), Some(false));
                assert_eq!(s.conditions.get("matches_illumina_run_id_format"), Some(true));
            }
            other => panic!("expected skip, got {other:?}"),
        }
    }

    #[test]
    fn sentinel_check_can_be_disabled() {
        let fs = MockFileSystem::new();
        fs.add_dir(format!("/fastq/{MISEQ}"));

        let mut opts = options(OutputDirPolicy::PerPipeline, ScanOrder::Filesystem);
        opts.check_symlinks_complete = false;
        let matcher = RunIdMatcher::new().unwrap();
        let item = scan(&fs, &opts, &matcher).unwrap().next().unwrap();
        assert!(item.as_run().is_some());
    }

    #[test]
    fn skip_existing_run_policy_checks_output_dir() {
        let fs = MockFileSystem::new();
        ready_run(&fs, MISEQ);
        fs.add_dir(format!("/out/{MISEQ}"));

        let matcher = RunIdMatcher::new().unwrap();

        let strict = options(OutputDirPolicy::SkipExistingRun, ScanOrder::Filesystem);
        match scan(&fs, &strict, &matcher).unwrap().next().unwrap() {
            DiscoveryItem::Skipped(s) => {
                assert_eq!(s.conditions.get("analysis_not_already_initiated"), Some(false))
            }
            other => panic!("expected skip, got {other:?}"),
        }

        let lenient = options(OutputDirPolicy::PerPipeline, ScanOrder::Filesystem);
        let item = scan(&fs, &lenient, &matcher).unwrap().next().unwrap();
        assert!(item.as_run().is_some());
    }

    #[test]
    fn reverse_order_visits_newest_first() {
        let fs = MockFileSystem::new();
        ready_run(&fs, MISEQ);
        ready_run(&fs, NEXTSEQ);

        let opts = options(OutputDirPolicy::PerPipeline, ScanOrder::ReverseLexical);
        let matcher = RunIdMatcher::new().unwrap();
        let ids: Vec<_> = scan(&fs, &opts, &matcher)
            .unwrap()
            .filter_map(|i| i.as_run().map(|r| r.run_id.clone()))
            .collect();
        assert_eq!(ids, vec![NEXTSEQ.to_string(), MISEQ.to_string()]);
    }

    #[test]
    fn unreadable_root_is_an_error() {
        let fs = MockFileSystem::new();
        let opts = options(OutputDirPolicy::PerPipeline, ScanOrder::Filesystem);
        let matcher = RunIdMatcher::new().unwrap();
        assert!(scan(&fs, &opts, &matcher).is_err());
    }
}
