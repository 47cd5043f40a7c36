//! One invocation of the loop controller.
//!
//! An external trigger (end of an actor turn, or process start) invokes
//! [`tick`]. The controller reloads persisted state, advances the phase
//! state machine through one transition function per phase, persists after
//! every call, and delivers at most one instruction to the actor. Nothing
//! survives in memory between invocations; callers must serialize
//! invocations per project.

use std::path::Path;

use anyhow::{Result, bail};
use tracing::{debug, info, instrument, warn};

use crate::core::coverage::validate_plan_coverage;
use crate::core::plan::{find_step, next_step_after, parse_steps};
use crate::core::types::Phase;
use crate::core::verify::verify_step;
use crate::io::build::{run_build_commands, run_test_commands};
use crate::io::config::{StabilizerConfig, load_config};
use crate::io::console::{Console, NotifyLevel};
use crate::io::exec::Exec;
use crate::io::layout::ControlPaths;
use crate::io::messenger::Messenger;
use crate::io::plan_store::{read_plan, triage_exists};
use crate::io::state::{RunState, load_run_state, write_run_state};
use crate::messages::{MessageEngine, VerifyReportContext};

/// Caller-supplied facts about the invocation trigger.
#[derive(Debug, Clone, Default)]
pub struct TickOptions {
    /// The actor's last turn was interrupted by the operator.
    pub interrupted: bool,
}

/// Result of one controller invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No active run for this project.
    Idle,
    /// An instruction was delivered; the run continues in `phase`.
    Advanced { phase: Phase },
    /// Done phase, closing artifact not yet written; stayed silent (the
    /// prior instruction already asked for it).
    AwaitingTriage,
    /// Closing artifact found; the run was marked inactive.
    Finished,
    /// A ceiling was exhausted; the run was marked inactive.
    Escalated { phase: Phase },
    /// The operator confirmed stopping after an interrupted actor turn.
    Stopped,
}

struct PhaseContext<'a, E: Exec, C: Console> {
    root: &'a Path,
    paths: &'a ControlPaths,
    config: &'a StabilizerConfig,
    engine: &'a MessageEngine,
    exec: &'a E,
    console: &'a C,
}

/// Advance the state machine by one invocation.
#[instrument(skip_all, fields(root = %root.display(), interrupted = options.interrupted))]
pub fn tick<E: Exec, M: Messenger, C: Console>(
    root: &Path,
    exec: &E,
    messenger: &M,
    console: &C,
    options: &TickOptions,
) -> Result<TickOutcome> {
    let paths = ControlPaths::new(root);
    if !paths.state_path.exists() {
        return Ok(TickOutcome::Idle);
    }
    let mut state = load_run_state(&paths.state_path)?;
    if !state.active {
        return Ok(TickOutcome::Idle);
    }
    if state.phase == Phase::Scanning {
        bail!("run state is still at scanning; run `stabilizer start` to begin a run");
    }

    // An interrupted actor turn is an offer to stop, never an assumption.
    if options.interrupted
        && console.confirm("The last actor turn was interrupted. Stop the stabilization run?")?
    {
        state.active = false;
        write_run_state(&paths.state_path, &state)?;
        console.notify("Stabilization run stopped.", NotifyLevel::Info);
        return Ok(TickOutcome::Stopped);
    }

    let config = load_config(&paths.config_path)?;
    let engine = MessageEngine::new();
    let ctx = PhaseContext {
        root,
        paths: &paths,
        config: &config,
        engine: &engine,
        exec,
        console,
    };

    // One transition function per phase; persist after every call. Keep
    // driving only while a transition produced no instruction and the run is
    // still active and moving (the executing -> verifying edge).
    loop {
        let phase_before = state.phase;
        let instruction = match state.phase {
            Phase::Planning => plan_phase(&ctx, &mut state)?,
            Phase::Executing => execute_phase(&ctx, &mut state)?,
            Phase::Verifying => verify_phase(&ctx, &mut state)?,
            Phase::Done => done_phase(&ctx, &mut state)?,
            Phase::Scanning => bail!("scanning is not re-entered"),
        };
        write_run_state(&paths.state_path, &state)?;
        debug!(
            from = phase_before.as_str(),
            to = state.phase.as_str(),
            active = state.active,
            instruction = instruction.is_some(),
            "phase transition"
        );

        if let Some(message) = instruction {
            messenger.send(&message)?;
            if !state.active {
                return Ok(TickOutcome::Escalated { phase: state.phase });
            }
            return Ok(TickOutcome::Advanced { phase: state.phase });
        }
        if !state.active {
            return Ok(if state.phase == Phase::Done {
                TickOutcome::Finished
            } else {
                TickOutcome::Escalated { phase: state.phase }
            });
        }
        if state.phase == phase_before {
            // Only the done phase parks silently.
            return Ok(TickOutcome::AwaitingTriage);
        }
    }
}

/// PLANNING: read and validate the plan, then hand out the first step.
fn plan_phase<E: Exec, C: Console>(
    ctx: &PhaseContext<'_, E, C>,
    state: &mut RunState,
) -> Result<Option<String>> {
    let plan = read_plan(ctx.paths)?;
    let steps = plan.as_deref().map(parse_steps).unwrap_or_default();

    if steps.is_empty() {
        state.planning_retries += 1;
        if state.planning_retries >= ctx.config.max_planning_retries {
            state.active = false;
            ctx.console.notify(
                &format!(
                    "No usable plan after {} attempts. Stabilization run stopped.",
                    ctx.config.max_planning_retries
                ),
                NotifyLevel::Error,
            );
            return Ok(None);
        }
        return Ok(Some(ctx.engine.planning_retry(
            state.planning_retries,
            ctx.config.max_planning_retries,
        )?));
    }

    let plan_text = plan.unwrap_or_default();
    let validation = validate_plan_coverage(
        &plan_text,
        state.baseline_error_count,
        ctx.config.coverage_threshold,
    );
    if !validation.valid {
        state.planning_retries += 1;
        if state.planning_retries < ctx.config.max_planning_retries {
            let reason = validation
                .reason
                .unwrap_or_else(|| "The plan does not account for all errors.".to_string());
            return Ok(Some(ctx.engine.plan_rejected(
                &reason,
                state.planning_retries,
                ctx.config.max_planning_retries,
                state.baseline_error_count,
            )?));
        }
        // Forward progress beats perfection once the ceiling is hit.
        ctx.console.notify(
            &format!(
                "Plan still incomplete ({}) but proceeding after {} attempts.",
                validation.reason.as_deref().unwrap_or("under-covered"),
                ctx.config.max_planning_retries
            ),
            NotifyLevel::Warning,
        );
    }

    let first = &steps[0];
    state.phase = Phase::Executing;
    state.total_steps = steps.len();
    state.current_step_number = first.number;
    state.retries_on_current_step = 0;
    info!(
        steps = steps.len(),
        first_step = first.number,
        "plan accepted, executing"
    );
    Ok(Some(ctx.engine.execute_step(first, state)?))
}

/// EXECUTING: rebuild, verify the current step, then pick the next one.
fn execute_phase<E: Exec, C: Console>(
    ctx: &PhaseContext<'_, E, C>,
    state: &mut RunState,
) -> Result<Option<String>> {
    let build = run_build_commands(
        ctx.exec,
        ctx.root,
        &state.build_commands,
        &ctx.config.run_options(),
    )?;

    // The plan file may have been edited since the last invocation; always
    // relocate the current step in a fresh parse.
    let plan = read_plan(ctx.paths)?.unwrap_or_default();
    let steps = parse_steps(&plan);

    let Some(step) = find_step(&steps, state.current_step_number).cloned() else {
        if steps.is_empty() {
            state.phase = Phase::Verifying;
            return Ok(None);
        }
        // The plan was rewritten underneath us; resynchronize to its first
        // step without counting a retry.
        let first = &steps[0];
        warn!(
            missing_step = state.current_step_number,
            new_first = first.number,
            "plan rewritten, resynchronizing"
        );
        state.current_step_number = first.number;
        state.total_steps = steps.len();
        state.retries_on_current_step = 0;
        return Ok(Some(ctx.engine.execute_step(first, state)?));
    };

    let verdict = verify_step(
        step.category,
        state.current_error_count,
        build.total_error_count,
        build.all_passed,
    );

    if verdict.passed {
        state.current_error_count = verdict.new_error_count;
        state.retries_on_current_step = 0;

        // A fully clean build makes the remaining fix steps pointless.
        let skip_fix = build.all_passed && state.current_error_count == 0;
        match next_step_after(&steps, step.number, skip_fix) {
            Some(next) => {
                state.current_step_number = next.number;
                info!(step = next.number, "step verified, advancing");
                Ok(Some(ctx.engine.execute_step(next, state)?))
            }
            None => {
                state.phase = Phase::Verifying;
                Ok(None)
            }
        }
    } else {
        state.retries_on_current_step += 1;
        state.current_error_count = verdict.new_error_count;
        if state.retries_on_current_step >= ctx.config.max_step_retries {
            // The run stays alive pending the operator's decision; the
            // actor's next attempt or the human's input continues the loop.
            warn!(step = step.number, "step retries exhausted, escalating");
            return Ok(Some(
                ctx.engine
                    .escalate_step(&step, ctx.config.max_step_retries)?,
            ));
        }
        Ok(Some(ctx.engine.retry_step(
            &step,
            &verdict,
            state.retries_on_current_step,
            ctx.config.max_step_retries,
            &build.combined_output,
        )?))
    }
}

/// VERIFYING: rebuild, rerun tests only when the build passed, then either
/// finish or loop back to planning.
fn verify_phase<E: Exec, C: Console>(
    ctx: &PhaseContext<'_, E, C>,
    state: &mut RunState,
) -> Result<Option<String>> {
    let options = ctx.config.run_options();
    let build = run_build_commands(ctx.exec, ctx.root, &state.build_commands, &options)?;
    let tests = if build.all_passed && !state.test_commands.is_empty() {
        Some(run_test_commands(
            ctx.exec,
            ctx.root,
            &state.test_commands,
            &options,
        )?)
    } else {
        None
    };

    let tests_passed = tests.as_ref().map(|t| t.all_passed);
    let all_green = build.all_passed && tests_passed.unwrap_or(true);

    if all_green {
        state.phase = Phase::Done;
        state.current_error_count = 0;
        info!("verification green, awaiting triage document");
        return Ok(Some(ctx.engine.verify_report(&VerifyReportContext {
            build_passed: true,
            tests_ran: tests.is_some(),
            tests_passed: true,
            all_green: true,
            build_output: None,
            test_output: None,
        })?));
    }

    state.cycle_count += 1;
    if state.cycle_count >= ctx.config.max_cycles {
        state.active = false;
        warn!(
            cycles = state.cycle_count,
            remaining = build.total_error_count,
            "cycle ceiling reached, escalating"
        );
        return Ok(Some(ctx.engine.cycle_escalation(
            ctx.config.max_cycles,
            build.total_error_count,
        )?));
    }

    // Close the plan -> execute -> verify macro-cycle.
    state.phase = Phase::Planning;
    state.current_error_count = build.total_error_count;
    state.planning_retries = 0;
    info!(cycle = state.cycle_count, "verification failed, replanning");
    Ok(Some(ctx.engine.verify_report(&VerifyReportContext {
        build_passed: build.all_passed,
        tests_ran: tests.is_some(),
        tests_passed: tests_passed.unwrap_or(false),
        all_green: false,
        build_output: (!build.all_passed).then_some(build.combined_output),
        test_output: tests.and_then(|t| (!t.all_passed).then_some(t.combined_output)),
    })?))
}

/// DONE: finish once the closing artifact exists; stay silent otherwise.
fn done_phase<E: Exec, C: Console>(
    ctx: &PhaseContext<'_, E, C>,
    state: &mut RunState,
) -> Result<Option<String>> {
    if triage_exists(ctx.paths) {
        state.active = false;
        ctx.console.notify(
            "Stabilization complete: build and tests pass, triage document written.",
            NotifyLevel::Info,
        );
    }
    Ok(None)
}
