mod common;

use chrono::{Local, TimeZone};
use common::Harness;
use runwatch::engine::hooks::{
    transfer_results, HookContext, TransferOutcome, TransferSpec, DEFAULT_SAMPLE_FILES,
    TRANSFER_COMPLETE_FILE,
};
use runwatch::engine::{HookRegistry, PipelineState, PostAnalysisHook};
use runwatch::fs::mock::MockFileSystem;
use runwatch::fs::FileSystem;
use runwatch::pipeline::PipelineSpec;
use runwatch_test_utils::{ConfigFileBuilder, PipelineConfigBuilder, MISEQ_RUN};

const HCV: &str = "BCCDC-PHL/hcv-nf";

fn seed_outputs(fs: &MockFileSystem, out: &std::path::Path) {
    fs.add_file(out.join(format!("{MISEQ_RUN}_run_summary_report.csv")), "sample,genotype\n");
    let sample = out.join("S-01");
    fs.add_file(sample.join("So01_depth_plots.png"), "png");
    fs.add_file(sample.join("RAxML_bestTree.S-01_core"), "(a,b);");
    fs.add_file(sample.join("S-01_consensus_seqs.fa"), ">c\nACGT\n");
}

fn hcv_spec() -> PipelineSpec {
    PipelineSpec::from_config(&PipelineConfigBuilder::new(HCV, "v0.1.2").build())
}

#[tokio::test]
async fn hook_registered_by_hand_runs_after_completion() {
    let h = Harness::new();
    h.add_run(MISEQ_RUN, true);
    let out = Harness::pipeline_output_dir(MISEQ_RUN, HCV, "v0.1.2");
    seed_outputs(&h.fs, &out);

    let cfg = ConfigFileBuilder::rooted_at(common::ROOT)
        .with_pipeline(PipelineConfigBuilder::new(HCV, "v0.1.2").build())
        .build();
    let archive = Harness::root().join("archive");
    let mut hooks = HookRegistry::default();
    hooks.register(
        HCV,
        PostAnalysisHook::TransferResults(TransferSpec {
            report_dir: archive.clone(),
            sample_files: DEFAULT_SAMPLE_FILES.to_vec(),
        }),
    );

    let summary = h.orchestrator(cfg).with_hooks(hooks).run_pass().await;
    assert_eq!(summary.state_of(MISEQ_RUN, HCV), Some(PipelineState::Completed));

    let run_report = archive.join("hcv-nf-v0.1-output").join(MISEQ_RUN);
    let dests = h.fs.read_dir(&run_report).unwrap();
    assert_eq!(dests.len(), 1);
    assert!(h.fs.is_file(&dests[0].join(TRANSFER_COMPLETE_FILE)));
}

#[tokio::test]
async fn completed_pipeline_transfers_results_to_report_dir() {
    let h = Harness::new();
    h.add_run(MISEQ_RUN, true);
    let out = Harness::pipeline_output_dir(MISEQ_RUN, HCV, "v0.1.2");
    seed_outputs(&h.fs, &out);

    let cfg = ConfigFileBuilder::rooted_at(common::ROOT)
        .with_report_dir()
        .with_pipeline(
            PipelineConfigBuilder::new(HCV, "v0.1.2")
                .transfer_results()
                .build(),
        )
        .build();
    let summary = h.orchestrator(cfg).run_pass().await;
    assert_eq!(summary.state_of(MISEQ_RUN, HCV), Some(PipelineState::Completed));

    let run_report = Harness::root()
        .join("reports")
        .join("hcv-nf-v0.1-output")
        .join(MISEQ_RUN);
    let dests = h.fs.read_dir(&run_report).unwrap();
    assert_eq!(dests.len(), 1);
    let dest = &dests[0];

    assert!(h.fs.is_file(&dest.join(TRANSFER_COMPLETE_FILE)));
    assert!(h.fs.is_file(&dest.join(format!("{MISEQ_RUN}_run_summary_report.csv"))));
    assert!(h.fs.is_file(&dest.join("S-01").join("So01_depth_plots.png")));
    assert!(h.fs.is_file(&dest.join("S-01").join("RAxML_bestTree.S-01_core")));
    assert!(!h.fs.exists(&dest.join("S-01").join("S-01_genotype_calls_nt.csv")));
}

#[test]
fn missing_files_are_reported_not_fatal() {
    let fs = MockFileSystem::new();
    let out = Harness::pipeline_output_dir(MISEQ_RUN, HCV, "v0.1.2");
    seed_outputs(&fs, &out);
    let spec = hcv_spec();
    let transfer = TransferSpec {
        report_dir: "/reports".into(),
        sample_files: DEFAULT_SAMPLE_FILES.to_vec(),
    };
    let ctx = HookContext {
        run_id: MISEQ_RUN,
        spec: &spec,
        output_dir: &out,
        now: Local.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap(),
    };

    let (destination, missing) = match transfer_results(&fs, &transfer, &ctx).unwrap() {
        TransferOutcome::Transferred { destination, missing } => (destination, missing),
        other => panic!("expected transfer, got {other:?}"),
    };
    assert_eq!(
        destination,
        std::path::PathBuf::from(format!(
            "/reports/hcv-nf-v0.1-output/{MISEQ_RUN}/2024-03-05_09-30-00"
        ))
    );
    // ns5b tree and genotype calls were never produced.
    assert_eq!(missing.len(), 2);
}

#[test]
fn completed_transfer_is_not_repeated() {
    let fs = MockFileSystem::new();
    let out = Harness::pipeline_output_dir(MISEQ_RUN, HCV, "v0.1.2");
    seed_outputs(&fs, &out);
    let spec = hcv_spec();
    let transfer = TransferSpec {
        report_dir: "/reports".into(),
        sample_files: DEFAULT_SAMPLE_FILES.to_vec(),
    };
    let first = HookContext {
        run_id: MISEQ_RUN,
        spec: &spec,
        output_dir: &out,
        now: Local.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap(),
    };
    let second = HookContext {
        now: Local.with_ymd_and_hms(2024, 3, 6, 9, 30, 0).unwrap(),
        ..first
    };

    assert!(matches!(
        transfer_results(&fs, &transfer, &first).unwrap(),
        TransferOutcome::Transferred { .. }
    ));
    assert!(matches!(
        transfer_results(&fs, &transfer, &second).unwrap(),
        TransferOutcome::AlreadyComplete { .. }
    ));
}

#[test]
fn incomplete_destination_is_left_alone() {
    let fs = MockFileSystem::new();
    let out = Harness::pipeline_output_dir(MISEQ_RUN, HCV, "v0.1.2");
    seed_outputs(&fs, &out);
    let spec = hcv_spec();
    let transfer = TransferSpec {
        report_dir: "/reports".into(),
        sample_files: DEFAULT_SAMPLE_FILES.to_vec(),
    };
    let dest = format!("/reports/hcv-nf-v0.1-output/{MISEQ_RUN}/2024-03-05_09-30-00");
    fs.add_file(format!("{dest}/partial.csv"), "x");

    let ctx = HookContext {
        run_id: MISEQ_RUN,
        spec: &spec,
        output_dir: &out,
        now: Local.with_ymd_and_hms(2024, 3, 5, 9, 30, 0).unwrap(),
    };
    assert!(matches!(
        transfer_results(&fs, &transfer, &ctx).unwrap(),
        TransferOutcome::DestinationIncomplete { .. }
    ));
    assert!(!fs.exists(std::path::Path::new(&format!("{dest}/{TRANSFER_COMPLETE_FILE}"))));
}
