//! Re-emission of the current instruction after a process restart.
//!
//! Resuming never advances the state machine: it only repeats the
//! instruction the persisted phase is waiting on, so an actor whose memory
//! was reset can pick up exactly where the run left off.

use std::path::Path;

use anyhow::Result;
use tracing::info;

use crate::core::plan::{find_step, parse_steps};
use crate::core::types::Phase;
use crate::io::layout::ControlPaths;
use crate::io::messenger::Messenger;
use crate::io::plan_store::read_plan;
use crate::io::state::load_or_default;
use crate::messages::MessageEngine;

/// Outcome of `stabilizer resume`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// No active run for this project.
    Idle,
    /// The instruction for the persisted phase was re-emitted.
    Reissued { phase: Phase },
    /// Done phase: the prior instruction already asked for the closing
    /// artifact, nothing is repeated.
    AwaitingTriage,
}

/// Re-emit the instruction for the persisted phase and step.
pub fn resume_run<M: Messenger>(root: &Path, messenger: &M) -> Result<ResumeOutcome> {
    let paths = ControlPaths::new(root);
    let state = load_or_default(&paths.state_path)?;
    if !state.active || state.phase == Phase::Scanning {
        return Ok(ResumeOutcome::Idle);
    }

    let engine = MessageEngine::new();
    match state.phase {
        Phase::Executing => {
            let plan = read_plan(&paths)?.unwrap_or_default();
            let steps = parse_steps(&plan);
            match find_step(&steps, state.current_step_number) {
                Some(step) => {
                    info!(step = step.number, "re-emitting step instruction");
                    messenger.send(&engine.execute_step(step, &state)?)?;
                }
                // The plan no longer carries the recorded step; the next
                // tick resynchronizes, so fall back to a phase reminder.
                None => messenger.send(&engine.resume(Phase::Planning)?)?,
            }
            Ok(ResumeOutcome::Reissued { phase: state.phase })
        }
        Phase::Planning | Phase::Verifying => {
            messenger.send(&engine.resume(state.phase)?)?;
            Ok(ResumeOutcome::Reissued { phase: state.phase })
        }
        Phase::Done => Ok(ResumeOutcome::AwaitingTriage),
        Phase::Scanning => Ok(ResumeOutcome::Idle),
    }
}
