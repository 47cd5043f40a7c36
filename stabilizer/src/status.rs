//! One-line status summaries for the operator surface.

use crate::core::types::Phase;
use crate::io::state::RunState;

/// Render the run's status as a single line, or `None` when no run is
/// active.
pub fn status_line(state: &RunState) -> Option<String> {
    if !state.active {
        return None;
    }
    let line = match state.phase {
        Phase::Scanning => "stabilizer: scanning...".to_string(),
        Phase::Planning => "stabilizer: waiting for plan".to_string(),
        Phase::Executing => format!(
            "stabilizer: step {}/{}, {} errors (cycle {})",
            state.current_step_number,
            state.total_steps,
            state.current_error_count,
            state.cycle_count
        ),
        Phase::Verifying => "stabilizer: final verification".to_string(),
        Phase::Done => "stabilizer: done, waiting for triage".to_string(),
    };
    Some(line)
}
