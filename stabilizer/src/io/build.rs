//! Sequential execution of build and test command lists with combined
//! reporting.
//!
//! Commands run strictly in order so that later commands' output can be
//! attributed to a consistent prior state. Each command string is split on
//! whitespace into a program and arguments; there is no shell interpretation
//! and no quoting support.

use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::debug;

use crate::core::errors::count_errors;
use crate::io::exec::{Exec, ExecOutput, ExecRequest};

/// Execution knobs shared by build and test runs.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    /// Line budget for each command's output block in the combined report.
    pub max_output_lines: usize,
}

/// Aggregate result of running the build command list.
#[derive(Debug, Clone)]
pub struct BuildReport {
    /// Sum of per-command heuristic error counts.
    pub total_error_count: usize,
    /// Per-command blocks (invocation, exit code, error count, truncated
    /// output) joined with separators.
    pub combined_output: String,
    /// True iff every command exited 0.
    pub all_passed: bool,
}

/// Aggregate result of running the test command list.
///
/// Test failures gate the verifying phase but are never counted toward the
/// error budget, so no error counting happens here.
#[derive(Debug, Clone)]
pub struct TestReport {
    pub all_passed: bool,
    pub combined_output: String,
}

/// Run every build command in order, counting error-looking lines per
/// command.
pub fn run_build_commands<E: Exec>(
    exec: &E,
    workdir: &Path,
    commands: &[String],
    options: &RunOptions,
) -> Result<BuildReport> {
    let mut total_error_count = 0;
    let mut blocks = Vec::new();
    let mut all_passed = true;

    for command in commands {
        let output = run_one(exec, workdir, command, options)?;
        let combined = output.combined_text();
        let errors = count_errors(&combined);
        total_error_count += errors;
        if !output.success() {
            all_passed = false;
        }
        blocks.push(format!(
            "$ {command}\nExit code: {}\nErrors found: {errors}\n{}",
            exit_code_label(&output),
            truncate_output(&combined, options.max_output_lines)
        ));
    }

    debug!(total_error_count, all_passed, "build commands finished");
    Ok(BuildReport {
        total_error_count,
        combined_output: blocks.join("\n\n---\n\n"),
        all_passed,
    })
}

/// Run every test command in order, tracking pass/fail only.
pub fn run_test_commands<E: Exec>(
    exec: &E,
    workdir: &Path,
    commands: &[String],
    options: &RunOptions,
) -> Result<TestReport> {
    let mut blocks = Vec::new();
    let mut all_passed = true;

    for command in commands {
        let output = run_one(exec, workdir, command, options)?;
        if !output.success() {
            all_passed = false;
        }
        blocks.push(format!(
            "$ {command}\nExit code: {}\n{}",
            exit_code_label(&output),
            truncate_output(&output.combined_text(), options.max_output_lines)
        ));
    }

    debug!(all_passed, "test commands finished");
    Ok(TestReport {
        all_passed,
        combined_output: blocks.join("\n\n---\n\n"),
    })
}

fn run_one<E: Exec>(
    exec: &E,
    workdir: &Path,
    command: &str,
    options: &RunOptions,
) -> Result<ExecOutput> {
    let (program, args) = split_command(command)?;
    debug!(command, "running command");
    exec.exec(&ExecRequest {
        program,
        args,
        workdir: workdir.to_path_buf(),
        timeout: options.timeout,
        output_limit_bytes: options.output_limit_bytes,
    })
}

/// Split a command string on whitespace into a program and arguments.
fn split_command(command: &str) -> Result<(String, Vec<String>)> {
    let mut parts = command.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| anyhow!("empty command string"))?;
    Ok((program.to_string(), parts.map(str::to_string).collect()))
}

fn exit_code_label(output: &ExecOutput) -> String {
    if output.timed_out {
        return "timed out".to_string();
    }
    match output.exit_code {
        Some(code) => code.to_string(),
        None => "killed".to_string(),
    }
}

/// Keep the first and last half of an over-long output, with an explicit
/// omitted-lines marker in between. The earliest failures and the final
/// summary lines carry the most signal.
pub fn truncate_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();
    if lines.len() <= max_lines {
        return output.to_string();
    }
    let half = max_lines / 2;
    let omitted = lines.len() - half * 2;
    format!(
        "{}\n\n... ({omitted} lines omitted) ...\n\n{}",
        lines[..half].join("\n"),
        lines[lines.len() - half..].join("\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedExec, ScriptedResult};

    fn options() -> RunOptions {
        RunOptions {
            timeout: Duration::from_secs(5),
            output_limit_bytes: 100_000,
            max_output_lines: 200,
        }
    }

    #[test]
    fn sums_error_counts_across_commands() {
        let exec = ScriptedExec::new(vec![
            ScriptedResult::failed(1, "error[E0425]: a\nerror[E0425]: b\n"),
            ScriptedResult::failed(1, "error: c\n"),
        ]);
        let report = run_build_commands(
            &exec,
            Path::new("."),
            &["cargo build".to_string(), "make".to_string()],
            &options(),
        )
        .expect("report");
        assert_eq!(report.total_error_count, 3);
        assert!(!report.all_passed);
        assert!(report.combined_output.contains("$ cargo build"));
        assert!(report.combined_output.contains("\n\n---\n\n"));
    }

    #[test]
    fn all_passed_requires_every_command_to_exit_zero() {
        let exec = ScriptedExec::new(vec![
            ScriptedResult::ok("Finished\n"),
            ScriptedResult::failed(2, "boom\n"),
        ]);
        let report = run_build_commands(
            &exec,
            Path::new("."),
            &["cargo build".to_string(), "cargo doc".to_string()],
            &options(),
        )
        .expect("report");
        assert!(!report.all_passed);
        assert_eq!(report.total_error_count, 0);
    }

    #[test]
    fn commands_are_split_on_whitespace_without_shell() {
        let exec = ScriptedExec::new(vec![ScriptedResult::ok("")]);
        run_build_commands(
            &exec,
            Path::new("."),
            &["cargo build --manifest-path sub/Cargo.toml".to_string()],
            &options(),
        )
        .expect("report");
        assert_eq!(
            exec.calls.borrow().as_slice(),
            ["cargo build --manifest-path sub/Cargo.toml"]
        );
    }

    #[test]
    fn test_runs_do_not_count_errors() {
        let exec = ScriptedExec::new(vec![ScriptedResult::failed(
            1,
            "error: test failed\nerror: another\n",
        )]);
        let report =
            run_test_commands(&exec, Path::new("."), &["cargo test".to_string()], &options())
                .expect("report");
        assert!(!report.all_passed);
        assert!(!report.combined_output.contains("Errors found"));
    }

    #[test]
    fn truncation_keeps_head_and_tail_with_marker() {
        let output: Vec<String> = (0..30).map(|i| format!("line {i}")).collect();
        let truncated = truncate_output(&output.join("\n"), 10);
        assert!(truncated.starts_with("line 0"));
        assert!(truncated.ends_with("line 29"));
        assert!(truncated.contains("(20 lines omitted)"));
        assert!(!truncated.contains("line 15"));
    }

    #[test]
    fn short_output_is_untouched() {
        assert_eq!(truncate_output("a\nb", 10), "a\nb");
    }

    #[test]
    fn empty_command_string_is_rejected() {
        let exec = ScriptedExec::new(Vec::new());
        let err = run_build_commands(&exec, Path::new("."), &["   ".to_string()], &options())
            .unwrap_err();
        assert!(err.to_string().contains("empty command"));
    }
}
