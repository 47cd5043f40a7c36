//! Mechanical verification of a single executed step.

use crate::core::types::{StepCategory, VerifyResult};

/// Decide whether a step succeeded from before/after error counts and the
/// build outcome.
///
/// Only `Fix` steps are required to make net-positive progress. `Clean` and
/// `Organize` steps are held to a non-regression bar: their purpose is
/// hygiene, not error reduction.
pub fn verify_step(
    category: StepCategory,
    errors_before: usize,
    errors_after: usize,
    build_passed: bool,
) -> VerifyResult {
    match category {
        StepCategory::Clean => {
            if errors_after > errors_before {
                return VerifyResult {
                    passed: false,
                    reason: format!(
                        "Error count increased from {errors_before} to {errors_after} \
                         after cleanup. The removal broke something."
                    ),
                    new_error_count: errors_after,
                };
            }
            VerifyResult {
                passed: true,
                reason: "Clean step OK".to_string(),
                new_error_count: errors_after,
            }
        }
        StepCategory::Fix => {
            if build_passed && errors_after == 0 {
                return VerifyResult {
                    passed: true,
                    reason: "Build passes".to_string(),
                    new_error_count: 0,
                };
            }
            if errors_after >= errors_before {
                return VerifyResult {
                    passed: false,
                    reason: format!(
                        "Error count did not decrease. Before: {errors_before}. \
                         After: {errors_after}. The fix had no effect."
                    ),
                    new_error_count: errors_after,
                };
            }
            VerifyResult {
                passed: true,
                reason: format!("Errors decreased from {errors_before} to {errors_after}"),
                new_error_count: errors_after,
            }
        }
        StepCategory::Organize => {
            if errors_after > errors_before {
                return VerifyResult {
                    passed: false,
                    reason: format!(
                        "Error count increased from {errors_before} to {errors_after} \
                         after reorganization. Revert and try differently."
                    ),
                    new_error_count: errors_after,
                };
            }
            VerifyResult {
                passed: true,
                reason: "Organize step OK, build still clean".to_string(),
                new_error_count: errors_after,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_without_progress_fails() {
        let result = verify_step(StepCategory::Fix, 22, 22, false);
        assert!(!result.passed);
        assert_eq!(result.new_error_count, 22);
    }

    #[test]
    fn fix_reaching_clean_build_passes() {
        let result = verify_step(StepCategory::Fix, 5, 0, true);
        assert!(result.passed);
        assert_eq!(result.new_error_count, 0);
    }

    #[test]
    fn fix_with_partial_progress_passes() {
        let result = verify_step(StepCategory::Fix, 10, 4, false);
        assert!(result.passed);
        assert!(result.reason.contains("10"));
    }

    #[test]
    fn fix_with_regression_fails() {
        assert!(!verify_step(StepCategory::Fix, 3, 6, false).passed);
    }

    #[test]
    fn clean_regression_fails() {
        let result = verify_step(StepCategory::Clean, 10, 12, false);
        assert!(!result.passed);
        assert!(result.reason.contains("10"));
        assert!(result.reason.contains("12"));
    }

    #[test]
    fn clean_with_unchanged_count_passes() {
        assert!(verify_step(StepCategory::Clean, 7, 7, false).passed);
    }

    #[test]
    fn organize_regression_fails() {
        assert!(!verify_step(StepCategory::Organize, 0, 2, false).passed);
    }

    #[test]
    fn organize_holding_steady_passes() {
        assert!(verify_step(StepCategory::Organize, 0, 0, true).passed);
    }
}
