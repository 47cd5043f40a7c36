//! Persisted run state for the stabilization loop.
//!
//! The state file is the sole source of truth between invocations: every
//! invocation reloads it, mutates it, and writes it back atomically. It is
//! hand-editable and survives restarts, so it is validated against an
//! embedded JSON Schema before deserialization.

use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{Context, Result, anyhow};
use jsonschema::{Validator, validator_for};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::types::Phase;

const STATE_SCHEMA: &str = include_str!("../../schemas/run_state/v1.schema.json");

static STATE_VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(STATE_SCHEMA).expect("embedded run state schema should parse");
    validator_for(&schema).expect("embedded run state schema should compile")
});

/// Persisted bookkeeping for one stabilization run
/// (`.stabilizer/state.json`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunState {
    /// Whether a stabilization run is in progress.
    pub active: bool,
    /// Current state-machine node.
    pub phase: Phase,
    /// Fixed for the run, set at scanning.
    pub build_commands: Vec<String>,
    pub test_commands: Vec<String>,
    /// Error count measured at run start; never changes.
    pub baseline_error_count: usize,
    /// Most recently measured error count; updated after every build.
    pub current_error_count: usize,
    /// Literal number of the step being executed (not an index).
    pub current_step_number: u32,
    pub total_steps: usize,
    pub retries_on_current_step: u32,
    pub planning_retries: u32,
    /// Completed plan->execute->verify cycles; only ever increments.
    pub cycle_count: u32,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            active: false,
            phase: Phase::Scanning,
            build_commands: Vec::new(),
            test_commands: Vec::new(),
            baseline_error_count: 0,
            current_error_count: 0,
            current_step_number: 0,
            total_steps: 0,
            retries_on_current_step: 0,
            planning_retries: 0,
            cycle_count: 0,
        }
    }
}

/// Load run state from disk, validating against the embedded schema first.
pub fn load_run_state(path: &Path) -> Result<RunState> {
    debug!(path = %path.display(), "loading run state");
    let contents =
        fs::read_to_string(path).with_context(|| format!("read run state {}", path.display()))?;
    let value: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse run state {}", path.display()))?;
    validate_schema(&value)?;
    let state: RunState = serde_json::from_value(value)
        .with_context(|| format!("deserialize run state {}", path.display()))?;
    debug!(phase = state.phase.as_str(), active = state.active, "run state loaded");
    Ok(state)
}

/// Load run state, falling back to the inactive default when the file does
/// not exist yet.
pub fn load_or_default(path: &Path) -> Result<RunState> {
    if path.exists() {
        return load_run_state(path);
    }
    Ok(RunState::default())
}

/// Atomically write run state to disk (temp file + rename).
pub fn write_run_state(path: &Path, state: &RunState) -> Result<()> {
    debug!(path = %path.display(), phase = state.phase.as_str(), "writing run state");
    let mut buf = serde_json::to_string_pretty(state)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn validate_schema(value: &Value) -> Result<()> {
    let messages: Vec<String> = STATE_VALIDATOR
        .iter_errors(value)
        .map(|err| err.to_string())
        .collect();
    if !messages.is_empty() {
        return Err(anyhow!(
            "run state schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("run state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp run state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace run state {}", path.display()))?;
    Ok(())
}
