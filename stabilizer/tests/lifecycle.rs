//! Loop-level tests for full stabilization lifecycle scenarios.
//!
//! These tests drive the controller through multiple invocations to verify
//! end-to-end behavior: phase transitions, persisted state, instruction
//! content, and loop termination.

use stabilizer::core::types::Phase;
use stabilizer::resume::{ResumeOutcome, resume_run};
use stabilizer::start::start_run;
use stabilizer::test_support::{
    RecordingMessenger, ScriptedExec, StaticConsole, TestProject, build_result, test_result,
};
use stabilizer::tick::{TickOptions, TickOutcome, tick};

fn run_tick(project: &TestProject, exec: &ScriptedExec, messenger: &RecordingMessenger) -> TickOutcome {
    tick(
        project.root(),
        exec,
        messenger,
        &StaticConsole::new(false),
        &TickOptions::default(),
    )
    .expect("tick")
}

/// Full happy path: 22 baseline errors, a two-step fix-only plan whose
/// impacts sum to 20 (above the 70% bar) is accepted; after both steps the
/// rebuilt error count is 0, so the controller goes executing -> verifying
/// -> done without ever looping back to planning.
///
/// Invocation sequence:
/// 1. start: baseline build (22 errors) + tests -> planning instruction
/// 2. tick: plan accepted -> step 1 instruction
/// 3. tick: rebuild (10 errors), step 1 verified -> step 2 instruction
/// 4. tick: rebuild (0), verify rebuild (0) + tests -> done, triage request
/// 5. tick after the triage file appears -> run finished
#[test]
fn fix_only_plan_reaches_done_without_a_planning_back_edge() {
    let project = TestProject::new().expect("project");
    let messenger = RecordingMessenger::new();

    let start_exec = ScriptedExec::new(vec![build_result(22), test_result(true)]);
    let outcome = start_run(
        project.root(),
        &start_exec,
        &messenger,
        &StaticConsole::new(false),
    )
    .expect("start");
    assert_eq!(outcome.baseline_error_count, 22);
    assert!(
        messenger
            .last()
            .expect("planning instruction")
            .contains("Approximate error count: 22")
    );

    project
        .write_plan(
            "# Stabilization plan\n\
             1. [fix] Repair the module import graph\n   Impact: Resolves ~12 errors\n\
             2. [fix] Align trait implementations with their definitions\n   Impact: Resolves ~8 errors\n",
        )
        .expect("plan");

    // Plan acceptance runs no builds.
    let outcome = run_tick(&project, &ScriptedExec::new(Vec::new()), &messenger);
    assert_eq!(
        outcome,
        TickOutcome::Advanced {
            phase: Phase::Executing
        }
    );
    assert!(messenger.last().expect("step 1").contains("Step 1 of 2"));

    // Step 1 verified: 22 -> 10 errors.
    let outcome = run_tick(&project, &ScriptedExec::new(vec![build_result(10)]), &messenger);
    assert_eq!(
        outcome,
        TickOutcome::Advanced {
            phase: Phase::Executing
        }
    );
    assert!(messenger.last().expect("step 2").contains("Step 2 of 2"));
    assert_eq!(project.read_state().expect("state").current_error_count, 10);

    // Step 2 verified clean; verification runs in the same invocation.
    let exec = ScriptedExec::new(vec![build_result(0), build_result(0), test_result(true)]);
    let outcome = run_tick(&project, &exec, &messenger);
    assert_eq!(outcome, TickOutcome::Advanced { phase: Phase::Done });

    let state = project.read_state().expect("state");
    assert_eq!(state.phase, Phase::Done);
    assert_eq!(state.cycle_count, 0, "no back-edge to planning");
    assert_eq!(state.current_error_count, 0);
    let message = messenger.last().expect("triage request");
    assert!(message.contains("All checks pass"));
    assert!(message.contains(".stabilizer/triage.md"));

    // The closing artifact's existence finishes the run.
    project.write_triage().expect("triage");
    let outcome = run_tick(&project, &ScriptedExec::new(Vec::new()), &messenger);
    assert_eq!(outcome, TickOutcome::Finished);
    assert!(!project.read_state().expect("state").active);
}

/// A build that never reaches zero errors: every macro-cycle executes the
/// plan, verification fails, and after the third cycle the run is marked
/// inactive with a final message carrying the remaining error count and a
/// bounded menu.
#[test]
fn never_green_build_escalates_at_the_cycle_ceiling() {
    let project = TestProject::new().expect("project");
    let messenger = RecordingMessenger::new();

    let start_exec = ScriptedExec::new(vec![build_result(5), test_result(true)]);
    start_run(
        project.root(),
        &start_exec,
        &messenger,
        &StaticConsole::new(false),
    )
    .expect("start");

    project
        .write_plan("1. [fix] Chase the undefined symbols\n   Impact: Resolves ~5 errors\n")
        .expect("plan");

    // Three macro-cycles; the error count shrinks but never hits zero.
    let mut remaining = 5usize;
    for cycle in 1..=3u32 {
        // Plan (re)accepted.
        let outcome = run_tick(&project, &ScriptedExec::new(Vec::new()), &messenger);
        assert_eq!(
            outcome,
            TickOutcome::Advanced {
                phase: Phase::Executing
            }
        );

        // The single fix step makes partial progress, then verification
        // rebuilds and still fails.
        remaining -= 1;
        let exec = ScriptedExec::new(vec![build_result(remaining), build_result(remaining)]);
        let outcome = run_tick(&project, &exec, &messenger);

        let state = project.read_state().expect("state");
        assert_eq!(state.cycle_count, cycle);
        if cycle < 3 {
            assert_eq!(
                outcome,
                TickOutcome::Advanced {
                    phase: Phase::Planning
                }
            );
            assert!(state.active);
            assert_eq!(state.planning_retries, 0);
        } else {
            assert_eq!(
                outcome,
                TickOutcome::Escalated {
                    phase: Phase::Verifying
                }
            );
            assert!(!state.active);
        }
    }

    let message = messenger.last().expect("escalation");
    assert!(message.contains("Remaining errors: 2"));
    assert!(message.contains("Start another stabilization run"));
    assert!(message.contains("Fix the remaining failures manually"));
    assert!(message.contains("Leave the project as it is"));

    // Further invocations are no-ops once the run is inactive.
    let outcome = run_tick(&project, &ScriptedExec::new(Vec::new()), &messenger);
    assert_eq!(outcome, TickOutcome::Idle);
}

/// Restarting the process mid-run: resuming a persisted executing state
/// re-emits the instruction for the exact recorded step, not step 1.
#[test]
fn resume_after_restart_targets_the_recorded_step() {
    let project = TestProject::new().expect("project");
    let messenger = RecordingMessenger::new();

    let start_exec = ScriptedExec::new(vec![build_result(9), test_result(true)]);
    start_run(
        project.root(),
        &start_exec,
        &messenger,
        &StaticConsole::new(false),
    )
    .expect("start");

    project
        .write_plan(
            "1. [clean] Delete the abandoned prototypes\n\
             4. [fix] Reconnect the storage layer\n   Impact: Resolves ~9 errors\n\
             6. [organize] Regroup the helpers\n",
        )
        .expect("plan");
    run_tick(&project, &ScriptedExec::new(Vec::new()), &messenger);

    // Step 1 passes (9 errors unchanged is fine for a clean step).
    run_tick(&project, &ScriptedExec::new(vec![build_result(9)]), &messenger);
    let state = project.read_state().expect("state");
    assert_eq!(state.current_step_number, 4);

    // Nothing in memory survives a restart; resume only reads the state file.
    let resumed = RecordingMessenger::new();
    let outcome = resume_run(project.root(), &resumed).expect("resume");
    assert_eq!(
        outcome,
        ResumeOutcome::Reissued {
            phase: Phase::Executing
        }
    );
    let message = resumed.last().expect("message");
    assert!(message.contains("Step 4 of 3"));
    assert!(message.contains("Reconnect the storage layer"));
    assert!(message.contains("Current error count: 9"));
}

/// Step retries are bounded: after the ceiling the actor is told to hand a
/// bounded choice to the operator, while the run itself stays alive.
#[test]
fn exhausted_step_retries_escalate_with_a_bounded_menu() {
    let project = TestProject::new().expect("project");
    let messenger = RecordingMessenger::new();

    let start_exec = ScriptedExec::new(vec![build_result(8), test_result(true)]);
    start_run(
        project.root(),
        &start_exec,
        &messenger,
        &StaticConsole::new(false),
    )
    .expect("start");
    project
        .write_plan("1. [fix] Untangle the circular imports\n   Impact: Resolves ~8 errors\n")
        .expect("plan");
    run_tick(&project, &ScriptedExec::new(Vec::new()), &messenger);

    // Three attempts with no measurable progress.
    for attempt in 1..=3u32 {
        let outcome = run_tick(&project, &ScriptedExec::new(vec![build_result(8)]), &messenger);
        assert_eq!(
            outcome,
            TickOutcome::Advanced {
                phase: Phase::Executing
            }
        );
        let state = project.read_state().expect("state");
        assert_eq!(state.retries_on_current_step, attempt);
        assert!(state.active, "escalation keeps the run alive");
    }

    let message = messenger.last().expect("escalation");
    assert!(message.contains("failed verification 3 times"));
    assert!(message.contains("Skip this step"));
    assert!(message.contains("Try a completely different approach"));
    assert!(message.contains("Stop the stabilization run"));
}
