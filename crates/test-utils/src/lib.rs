pub mod builders;
pub mod fake_runner;

use std::path::Path;
use std::sync::Once;

use runwatch::discovery::READY_SENTINEL_FILE;
use runwatch::exec::{CompletionMarker, COMPLETION_MARKER_FILE};
use runwatch::fs::FileSystem;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{ConfigFileBuilder, PipelineConfigBuilder};
pub use fake_runner::FakeRunner;

pub const MISEQ_RUN: &str = "240115_M01234_0123_000000000-ABCDE";
pub const NEXTSEQ_RUN: &str = "240116_VH00123_45_AAAAAAAM5";

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Create `<fastq_root>/<run_id>` with one FASTQ file and, if `ready`, the
/// staging sentinel.
pub fn add_run(fs: &dyn FileSystem, fastq_root: &Path, run_id: &str, ready: bool) {
    let dir = fastq_root.join(run_id);
    fs.create_dir_all(&dir).expect("create run dir");
    fs.write(&dir.join("S1_R1.fastq"), b"@r1\nACGT\n+\nIIII\n")
        .expect("write fastq");
    if ready {
        fs.write(&dir.join(READY_SENTINEL_FILE), b"{}")
            .expect("write sentinel");
    }
}

/// Write a completion marker as if the pipeline had finished earlier.
pub fn mark_complete(fs: &dyn FileSystem, pipeline_output_dir: &Path) {
    let now = chrono::Local::now();
    CompletionMarker::new(now, now)
        .write(fs, pipeline_output_dir)
        .expect("write marker");
    assert!(fs.is_file(&pipeline_output_dir.join(COMPLETION_MARKER_FILE)));
}
