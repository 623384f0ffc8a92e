// src/lib.rs

pub mod cli;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fastq;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{default_config_path, load_and_validate, ConfigFile};
use crate::discovery::{DiscoveryItem, DiscoveryOptions, RunIdMatcher};
use crate::engine::{run_daemon, DaemonOptions, Orchestrator};
use crate::exec::ProcessRunner;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::PipelineSpec;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the orchestrator with the real filesystem and process runner
/// - one pass (`--once`) or the periodic daemon loop
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let cfg = load_and_validate(&config_path)?;

    info!(
        event_type = "config_loaded",
        config_path = %config_path.display(),
        pipelines = cfg.pipelines().len(),
        "config loaded"
    );

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);

    if args.dry_run {
        print_dry_run(&cfg, fs.as_ref())?;
        return Ok(());
    }

    if args.once {
        let orchestrator = Orchestrator::new(cfg, fs, ProcessRunner)?;
        orchestrator.run_pass().await;
        return Ok(());
    }

    run_daemon(DaemonOptions { config_path }, cfg, fs, ProcessRunner).await
}

/// Dry-run output: configured pipelines and the runs a pass would visit.
fn print_dry_run(cfg: &ConfigFile, fs: &dyn FileSystem) -> Result<()> {
    println!("runwatch dry-run");
    println!(
        "  config.fastq_by_run_dir = {}",
        cfg.config().fastq_by_run_dir.display()
    );
    println!(
        "  config.analysis_output_dir = {}",
        cfg.config().analysis_output_dir.display()
    );
    println!(
        "  config.output_dir_policy = {:?}",
        cfg.config().output_dir_policy
    );
    println!();

    let specs = PipelineSpec::all_from_config(cfg);
    println!("pipelines ({}):", specs.len());
    for spec in &specs {
        println!("  - {} {}", spec.name(), spec.version());
        println!("      output dir: {}", spec.output_dir_name());
        if !spec.dependencies.is_empty() {
            let deps: Vec<String> = spec
                .dependencies
                .iter()
                .map(|d| format!("{} {}", d.name, d.version))
                .collect();
            println!("      after: {deps:?}");
        }
        if spec.estimate_read_length {
            println!("      estimate_read_length: true");
        }
    }
    println!();

    let options = DiscoveryOptions::from_config(cfg);
    let matcher = RunIdMatcher::new()?;
    println!("runs:");
    for item in discovery::scan(fs, &options, &matcher)? {
        match item {
            DiscoveryItem::Run(run) => println!("  + {}", run.run_id),
            DiscoveryItem::Skipped(skipped) => println!(
                "  - {} {}",
                skipped.path.display(),
                skipped.conditions.to_json()
            ),
        }
    }

    debug!("dry-run complete (no execution)");
    Ok(())
}
