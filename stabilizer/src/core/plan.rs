//! Plan document parsing and step selection.
//!
//! The plan is an external markdown document; this module extracts the
//! numbered steps and locates steps by their literal number. Everything that
//! is not a step line (headings, file lists, impact annotations) is ignored.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::types::{PlanStep, StepCategory};

/// `N. [clean|fix|organize] description`, one step per line.
static STEP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^(\d+)\.\s*\[(clean|fix|organize)\]\s+(.+)$")
        .expect("step pattern should be valid")
});

/// Parse every step line out of `plan`. Non-matching lines are silently
/// skipped. Parsing is idempotent and preserves document order.
pub fn parse_steps(plan: &str) -> Vec<PlanStep> {
    let mut steps = Vec::new();
    for caps in STEP_RE.captures_iter(plan) {
        let Ok(number) = caps[1].parse::<u32>() else {
            continue;
        };
        let category = match &caps[2] {
            "clean" => StepCategory::Clean,
            "fix" => StepCategory::Fix,
            _ => StepCategory::Organize,
        };
        steps.push(PlanStep {
            number,
            category,
            description: caps[3].trim().to_string(),
        });
    }
    steps
}

/// Locate a step by its literal number.
pub fn find_step(steps: &[PlanStep], number: u32) -> Option<&PlanStep> {
    steps.iter().find(|step| step.number == number)
}

/// Select the step to execute after `number`, in plan order.
///
/// With `skip_fix` set (the rebuilt project is already error-free) remaining
/// fix steps are skipped and the next clean/organize step is returned.
/// Returns `None` when `number` is not in the plan or nothing qualifying
/// remains.
pub fn next_step_after(steps: &[PlanStep], number: u32, skip_fix: bool) -> Option<&PlanStep> {
    let index = steps.iter().position(|step| step.number == number)?;
    let remaining = &steps[index + 1..];
    if skip_fix {
        remaining
            .iter()
            .find(|step| step.category != StepCategory::Fix)
    } else {
        remaining.first()
    }
}
