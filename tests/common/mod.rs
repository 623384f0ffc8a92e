#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use runwatch::config::ConfigFile;
use runwatch::engine::Orchestrator;
use runwatch::fs::mock::MockFileSystem;
use runwatch::pipeline::output_dir_name;
use runwatch_test_utils::{add_run, init_tracing, FakeRunner};

pub const ROOT: &str = "/data";

/// Mock filesystem rooted at `/data` plus a fake runner, shared with every
/// orchestrator built from it.
pub struct Harness {
    pub fs: MockFileSystem,
    pub runner: FakeRunner,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing();
        let fs = MockFileSystem::new();
        fs.add_dir(Self::fastq_root());
        Self {
            fs,
            runner: FakeRunner::new(),
        }
    }

    pub fn root() -> PathBuf {
        PathBuf::from(ROOT)
    }

    pub fn fastq_root() -> PathBuf {
        Self::root().join("fastq")
    }

    pub fn work_root() -> PathBuf {
        Self::root().join("work")
    }

    pub fn add_run(&self, run_id: &str, ready: bool) {
        add_run(&self.fs, &Self::fastq_root(), run_id, ready);
    }

    pub fn orchestrator(&self, cfg: ConfigFile) -> Orchestrator<FakeRunner> {
        Orchestrator::new(cfg, Arc::new(self.fs.clone()), self.runner.clone())
            .expect("orchestrator")
    }

    pub fn run_output_dir(run_id: &str) -> PathBuf {
        Self::root().join("output").join(run_id)
    }

    pub fn pipeline_output_dir(run_id: &str, name: &str, version: &str) -> PathBuf {
        Self::run_output_dir(run_id).join(output_dir_name(name, version))
    }

    pub fn marker(run_id: &str, name: &str, version: &str) -> PathBuf {
        Self::pipeline_output_dir(run_id, name, version).join("analysis_complete.json")
    }

    pub fn is_file(&self, path: &Path) -> bool {
        use runwatch::fs::FileSystem;
        self.fs.is_file(path)
    }
}
