//! Host execution seam for build and test commands.
//!
//! The [`Exec`] trait decouples the loop controller from real process
//! execution. Tests use scripted implementations that return predetermined
//! outputs without spawning anything.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::instrument;

use crate::io::process::run_command_with_timeout;

/// Parameters for one command execution.
#[derive(Debug, Clone)]
pub struct ExecRequest {
    pub program: String,
    pub args: Vec<String>,
    /// Working directory for the child process.
    pub workdir: PathBuf,
    pub timeout: Duration,
    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

/// Captured result of one command execution.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    /// Exit code, `None` when the process was killed by a signal or timeout.
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub timed_out: bool,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// Stderr followed by stdout in one buffer, trimmed. Error diagnostics
    /// conventionally land on stderr, so they come first.
    pub fn combined_text(&self) -> String {
        format!(
            "{}\n{}",
            String::from_utf8_lossy(&self.stderr),
            String::from_utf8_lossy(&self.stdout)
        )
        .trim()
        .to_string()
    }
}

/// Abstraction over the host's process-execution primitive.
pub trait Exec {
    fn exec(&self, request: &ExecRequest) -> Result<ExecOutput>;
}

/// Executor backed by real child processes.
pub struct SystemExec;

impl Exec for SystemExec {
    #[instrument(skip_all, fields(program = %request.program))]
    fn exec(&self, request: &ExecRequest) -> Result<ExecOutput> {
        let mut cmd = Command::new(&request.program);
        cmd.args(&request.args).current_dir(&request.workdir);
        let output = run_command_with_timeout(cmd, request.timeout, request.output_limit_bytes)
            .with_context(|| format!("run {}", request.program))?;
        Ok(ExecOutput {
            exit_code: output.status.code(),
            stdout: output.stdout,
            stderr: output.stderr,
            timed_out: output.timed_out,
        })
    }
}
