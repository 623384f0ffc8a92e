// src/exec/backend.rs

//! Pluggable process runner abstraction.
//!
//! The executor talks to a `PipelineRunner` instead of spawning processes
//! itself. Production uses [`ProcessRunner`]; tests provide a fake that
//! records invocations and returns scripted exit codes.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tracing::debug;

use super::command::PipelineInvocation;

/// Captured result of one external process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, for failure logs.
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Trait abstracting how a built invocation is executed.
///
/// An `Err` means the process could not be started at all; a process that
/// ran and exited nonzero is an `Ok` with a failing [`ProcessOutput`].
pub trait PipelineRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        invocation: &'a PipelineInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + 'a>>;
}

/// Spawns the runner program directly (no shell) inside the work directory
/// and waits for it to exit. There is no timeout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl PipelineRunner for ProcessRunner {
    fn run<'a>(
        &'a self,
        invocation: &'a PipelineInvocation,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessOutput>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                program = %invocation.program,
                work_dir = %invocation.work_dir.display(),
                "spawning pipeline process"
            );

            let output = Command::new(&invocation.program)
                .args(&invocation.args)
                .current_dir(&invocation.work_dir)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .with_context(|| format!("spawning '{}'", invocation.program))?;

            Ok(ProcessOutput {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combined_skips_empty_streams() {
        let out = ProcessOutput {
            exit_code: Some(1),
            stdout: String::new(),
            stderr: "boom".into(),
        };
        assert_eq!(out.combined(), "boom");
        assert!(!out.success());
    }
}
