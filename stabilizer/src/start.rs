//! Orchestration for starting a stabilization run.
//!
//! Starting a run is the scanning phase's entry action and is never
//! re-entered: detect the build stack, measure the error baseline once, and
//! hand the project over to the planning phase with a single instruction.

use std::path::Path;

use anyhow::{Result, bail};
use tracing::{debug, info};

use crate::core::types::Phase;
use crate::io::build::{run_build_commands, run_test_commands};
use crate::io::config::load_config;
use crate::io::console::{Console, NotifyLevel};
use crate::io::exec::Exec;
use crate::io::layout::ControlPaths;
use crate::io::messenger::Messenger;
use crate::io::stack::detect_stack;
use crate::io::state::{RunState, load_or_default, write_run_state};
use crate::messages::{MessageEngine, PlanningContext};

/// Outcome of `stabilizer start`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartOutcome {
    /// False when an already-active run was kept instead of restarted.
    pub started: bool,
    pub baseline_error_count: usize,
    pub build_commands: Vec<String>,
    pub test_commands: Vec<String>,
}

/// Start a stabilization run in `root`.
///
/// Fails as a fatal precondition when no build system is detected. When a
/// run is already active, the operator is asked before restarting from
/// scratch.
pub fn start_run<E: Exec, M: Messenger, C: Console>(
    root: &Path,
    exec: &E,
    messenger: &M,
    console: &C,
) -> Result<StartOutcome> {
    debug!(root = %root.display(), "starting stabilization run");
    let paths = ControlPaths::new(root);
    let config = load_config(&paths.config_path)?;

    let existing = load_or_default(&paths.state_path)?;
    if existing.active
        && !console.confirm("A stabilization run is already active. Restart it from scratch?")?
    {
        console.notify("Keeping the active stabilization run.", NotifyLevel::Info);
        return Ok(StartOutcome {
            started: false,
            baseline_error_count: existing.baseline_error_count,
            build_commands: existing.build_commands,
            test_commands: existing.test_commands,
        });
    }

    console.notify("Scanning project for build systems...", NotifyLevel::Info);
    let stack = detect_stack(root);
    if stack.is_empty() {
        bail!(
            "no build system detected (looked for Cargo.toml, package.json, go.mod, \
             pyproject.toml, setup.py, pom.xml, build.gradle, CMakeLists.txt, Makefile, \
             Package.swift)"
        );
    }

    let options = config.run_options();
    let build = run_build_commands(exec, root, &stack.build_commands, &options)?;

    // Run tests up front too, so the actor sees ALL issues in the planning
    // instruction, not just build errors. Test failures never count toward
    // the error budget.
    let test_output = if stack.test_commands.is_empty() {
        None
    } else {
        let tests = run_test_commands(exec, root, &stack.test_commands, &options)?;
        (!tests.all_passed).then_some(tests.combined_output)
    };

    let state = RunState {
        active: true,
        phase: Phase::Planning,
        build_commands: stack.build_commands.clone(),
        test_commands: stack.test_commands.clone(),
        baseline_error_count: build.total_error_count,
        current_error_count: build.total_error_count,
        ..RunState::default()
    };
    write_run_state(&paths.state_path, &state)?;

    console.notify(
        &format!(
            "{} build errors found. Build commands: {}",
            build.total_error_count,
            stack.build_commands.join(", ")
        ),
        NotifyLevel::Info,
    );

    let engine = MessageEngine::new();
    let instruction = if build.total_error_count == 0 && build.all_passed {
        engine.organize_only()?
    } else {
        engine.planning(&PlanningContext {
            build_commands: stack.build_commands.join(", "),
            test_commands: if stack.test_commands.is_empty() {
                "(none detected)".to_string()
            } else {
                stack.test_commands.join(", ")
            },
            error_count: build.total_error_count,
            build_output: build.combined_output,
            test_output,
        })?
    };
    messenger.send(&instruction)?;

    info!(
        baseline = build.total_error_count,
        build_commands = ?stack.build_commands,
        "stabilization run started"
    );
    Ok(StartOutcome {
        started: true,
        baseline_error_count: build.total_error_count,
        build_commands: stack.build_commands,
        test_commands: stack.test_commands,
    })
}
