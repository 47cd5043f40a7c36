//! Plan coverage validation against the baseline error count.

use std::sync::LazyLock;

use regex::Regex;

use crate::core::plan::parse_steps;
use crate::core::types::PlanValidation;

/// `Impact: Resolves ~N errors` lines, tilde optional, anywhere in the plan.
static IMPACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^\s*impact:\s*resolves?\s*~?(\d+)\s*error")
        .expect("impact pattern should be valid")
});

/// Decide whether the plan's self-declared impact is sufficient to accept it.
///
/// A clean baseline (0 errors) accepts any non-empty step list: the run is in
/// pure cleanup/reorganization mode and impact accounting does not apply.
/// Otherwise the summed impact must cover at least `threshold` of the
/// baseline. The threshold leaves slack for cascading errors that resolve
/// automatically once a root cause is fixed; demanding 100% coverage would
/// force the actor to over-enumerate secondary symptoms.
pub fn validate_plan_coverage(
    plan: &str,
    baseline_error_count: usize,
    threshold: f64,
) -> PlanValidation {
    let steps = parse_steps(plan);

    if steps.is_empty() {
        return PlanValidation {
            valid: false,
            step_count: 0,
            estimated_impact: 0,
            baseline_error_count,
            reason: Some("No steps found in plan.".to_string()),
        };
    }

    if baseline_error_count == 0 {
        return PlanValidation {
            valid: true,
            step_count: steps.len(),
            estimated_impact: 0,
            baseline_error_count: 0,
            reason: None,
        };
    }

    let mut estimated_impact = 0usize;
    let mut has_impact_lines = false;
    for caps in IMPACT_RE.captures_iter(plan) {
        if let Ok(count) = caps[1].parse::<usize>() {
            estimated_impact += count;
            has_impact_lines = true;
        }
    }

    if !has_impact_lines {
        return PlanValidation {
            valid: false,
            step_count: steps.len(),
            estimated_impact: 0,
            baseline_error_count,
            reason: Some(format!(
                "Plan has {} steps but no Impact lines. Every step must carry an \
                 \"Impact: Resolves ~N errors\" line so coverage can be verified.",
                steps.len()
            )),
        };
    }

    let coverage_ratio = estimated_impact as f64 / baseline_error_count as f64;
    if coverage_ratio < threshold {
        return PlanValidation {
            valid: false,
            step_count: steps.len(),
            estimated_impact,
            baseline_error_count,
            reason: Some(format!(
                "Plan estimates fixing ~{estimated_impact} errors but there are \
                 {baseline_error_count}. That is only {}% coverage. Root causes are \
                 missing: re-read the build output and account for ALL errors.",
                (coverage_ratio * 100.0).round() as u32
            )),
        };
    }

    PlanValidation {
        valid: true,
        step_count: steps.len(),
        estimated_impact,
        baseline_error_count,
        reason: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLD: f64 = 0.7;

    fn plan_with_impacts(impacts: &[usize]) -> String {
        let mut plan = String::new();
        for (i, impact) in impacts.iter().enumerate() {
            plan.push_str(&format!(
                "{}. [fix] Repair failure group {}\n   Impact: Resolves ~{} errors\n",
                i + 1,
                i + 1,
                impact
            ));
        }
        plan
    }

    #[test]
    fn empty_plan_is_invalid() {
        let result = validate_plan_coverage("## Notes only\n", 22, THRESHOLD);
        assert!(!result.valid);
        assert_eq!(result.step_count, 0);
        assert!(result.reason.as_deref().unwrap().contains("No steps"));
    }

    #[test]
    fn under_covering_plan_is_rejected_with_baseline_in_reason() {
        let result = validate_plan_coverage(&plan_with_impacts(&[8]), 22, THRESHOLD);
        assert!(!result.valid);
        assert_eq!(result.estimated_impact, 8);
        let reason = result.reason.expect("reason");
        assert!(reason.contains("22"));
        assert!(reason.contains("36%"));
    }

    #[test]
    fn sufficient_coverage_is_accepted() {
        // 18 / 22 is roughly 82%, above the 70% bar.
        let result = validate_plan_coverage(&plan_with_impacts(&[12, 6]), 22, THRESHOLD);
        assert!(result.valid);
        assert_eq!(result.estimated_impact, 18);
    }

    #[test]
    fn missing_impact_lines_invalidate_a_nonclean_baseline() {
        let result = validate_plan_coverage("1. [fix] Repair everything\n", 22, THRESHOLD);
        assert!(!result.valid);
        assert!(result.reason.as_deref().unwrap().contains("Impact"));
    }

    #[test]
    fn clean_baseline_accepts_any_nonempty_plan() {
        let result = validate_plan_coverage("1. [organize] Split modules\n", 0, THRESHOLD);
        assert!(result.valid);
        assert_eq!(result.estimated_impact, 0);
    }

    #[test]
    fn impact_lines_sum_across_the_document() {
        let plan = "Intro prose.\n\
            1. [fix] A\n\
            Impact: resolves 3 errors\n\
            Some discussion.\n\
            2. [fix] B\n\
            Impact: Resolves ~4 errors\n";
        let result = validate_plan_coverage(plan, 7, THRESHOLD);
        assert!(result.valid);
        assert_eq!(result.estimated_impact, 7);
    }
}
