use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use runwatch::exec::{PipelineInvocation, PipelineRunner, ProcessOutput};

#[derive(Debug, Default)]
struct FakeState {
    invocations: Vec<PipelineInvocation>,
    exit_codes: HashMap<String, i32>,
    spawn_errors: HashMap<String, String>,
}

/// A fake pipeline runner that:
/// - records every invocation it is handed
/// - exits 0 unless a pipeline was scripted to fail
///
/// Clones share state, so a test can keep one handle and give another to the
/// orchestrator.
#[derive(Debug, Clone, Default)]
pub struct FakeRunner {
    state: Arc<Mutex<FakeState>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every run of `pipeline_name` exit with `code`.
    pub fn fail_pipeline(&self, pipeline_name: &str, code: i32) -> &Self {
        self.state
            .lock()
            .unwrap()
            .exit_codes
            .insert(pipeline_name.to_string(), code);
        self
    }

    /// Make runs of one version of `pipeline_name` exit with `code`; other
    /// versions are unaffected.
    pub fn fail_version(&self, pipeline_name: &str, version: &str, code: i32) -> &Self {
        self.state
            .lock()
            .unwrap()
            .exit_codes
            .insert(format!("{pipeline_name}@{version}"), code);
        self
    }

    /// Make every run of `pipeline_name` fail to start.
    pub fn fail_to_spawn(&self, pipeline_name: &str, message: &str) -> &Self {
        self.state
            .lock()
            .unwrap()
            .spawn_errors
            .insert(pipeline_name.to_string(), message.to_string());
        self
    }

    /// Clear scripted failures for `pipeline_name`.
    pub fn succeed_pipeline(&self, pipeline_name: &str) -> &Self {
        let mut state = self.state.lock().unwrap();
        state.exit_codes.remove(pipeline_name);
        state.spawn_errors.remove(pipeline_name);
        self
    }

    pub fn invocations(&self) -> Vec<PipelineInvocation> {
        self.state.lock().unwrap().invocations.clone()
    }

    /// `(run_id, pipeline_name)` in launch order.
    pub fn launched(&self) -> Vec<(String, String)> {
        self.state
            .lock()
            .unwrap()
            .invocations
            .iter()
            .map(|inv| (inv.run_id.clone(), inv.pipeline.name.clone()))
            .collect()
    }

    pub fn launch_count(&self) -> usize {
        self.state.lock().unwrap().invocations.len()
    }
}

impl PipelineRunner for FakeRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a PipelineInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + 'a>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.invocations.push(invocation.clone());

            let name = &invocation.pipeline.name;
            if let Some(message) = state.spawn_errors.get(name) {
                return Err(anyhow!("{message}"));
            }

            let versioned = format!("{name}@{}", invocation.pipeline.version);
            let code = state
                .exit_codes
                .get(&versioned)
                .or_else(|| state.exit_codes.get(name))
                .copied()
                .unwrap_or(0);
            Ok(ProcessOutput {
                exit_code: Some(code),
                stdout: format!("fake run of {name} for {}", invocation.run_id),
                stderr: if code == 0 {
                    String::new()
                } else {
                    "simulated failure".to_string()
                },
            })
        })
    }
}
