//! Shared deterministic types for the stabilization loop.
//!
//! These types define stable contracts between core components. They should
//! not depend on external state or I/O and must remain deterministic across
//! runs.

use serde::{Deserialize, Serialize};

/// Phase of the stabilization state machine.
///
/// Transitions are strictly forward except for the verifying -> planning
/// back-edge (remediation loop). Marking the run inactive is terminal from
/// any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Scanning,
    Planning,
    Executing,
    Verifying,
    Done,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Scanning => "scanning",
            Phase::Planning => "planning",
            Phase::Executing => "executing",
            Phase::Verifying => "verifying",
            Phase::Done => "done",
        }
    }
}

/// Category of a plan step.
///
/// Only `Fix` steps must make net progress; `Clean` and `Organize` are held
/// to a non-regression bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepCategory {
    Clean,
    Fix,
    Organize,
}

impl StepCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            StepCategory::Clean => "clean",
            StepCategory::Fix => "fix",
            StepCategory::Organize => "organize",
        }
    }

    /// Conventional commit prefix the actor is asked to use for this category.
    pub fn commit_prefix(self) -> &'static str {
        match self {
            StepCategory::Clean => "chore",
            StepCategory::Fix => "fix",
            StepCategory::Organize => "refactor",
        }
    }
}

/// A step parsed from the plan document.
///
/// Step numbers are literal identifiers, not array indices: they need not be
/// contiguous or start at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanStep {
    pub number: u32,
    pub category: StepCategory,
    pub description: String,
}

/// Outcome of validating a plan's coverage against the baseline error count.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanValidation {
    pub valid: bool,
    pub step_count: usize,
    pub estimated_impact: usize,
    pub baseline_error_count: usize,
    pub reason: Option<String>,
}

/// Verdict for a single executed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyResult {
    pub passed: bool,
    pub reason: String,
    pub new_error_count: usize,
}
