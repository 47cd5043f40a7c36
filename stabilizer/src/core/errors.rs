//! Heuristic error extraction from raw build output.
//!
//! Rough error counting for mechanical verification. NOT meant to be
//! exhaustive: the actor reads the full output for ground truth, this module
//! only produces a progress counter to track between steps. Any mismatch
//! with a real compiler's error count is expected, not a bug.

use std::sync::LazyLock;

use regex::Regex;

/// Most compilers prefix error lines with "error" followed by a bracket,
/// colon, parenthesis or whitespace. Catches Rust, C/C++, Swift, Java,
/// TypeScript, Go and most others.
static ERROR_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^error[\[:(\s]").expect("error line pattern should be valid"));

/// Terminal summary lines such as "2 errors generated" or "Found 5 errors".
static SUMMARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d+)\s+errors?\b").expect("summary pattern should be valid"));

/// Count error-looking lines in `output`. See [`extract_error_lines`].
pub fn count_errors(output: &str) -> usize {
    extract_error_lines(output).len()
}

/// Extract error-looking lines using a two-tier heuristic.
///
/// Tier 1 collects every trimmed line that starts with an error marker. Only
/// when tier 1 finds nothing, tier 2 looks for the first `"<N> errors"`
/// summary line and synthesizes N generic entries from it. The tiers are
/// mutually exclusive per invocation, never summed.
pub fn extract_error_lines(output: &str) -> Vec<String> {
    let mut errors = Vec::new();

    for line in output.lines() {
        let trimmed = line.trim();
        if ERROR_LINE_RE.is_match(trimmed) {
            errors.push(trimmed.to_string());
        }
    }

    if errors.is_empty() {
        for line in output.lines() {
            if let Some(caps) = SUMMARY_RE.captures(line) {
                let Ok(count) = caps[1].parse::<usize>() else {
                    continue;
                };
                for _ in 0..count {
                    errors.push("error: (counted from summary)".to_string());
                }
                break;
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_each_primary_error_line_once() {
        let output = "\
warning: unused import\n\
error[E0425]: cannot find value `x` in this scope\n\
  --> src/main.rs:3:5\n\
error: aborting due to previous error\n\
ERROR: linker failed\n";
        assert_eq!(count_errors(output), 3);
    }

    #[test]
    fn primary_matches_suppress_summary_fallback() {
        // The terminal "2 errors" line must not be added on top of tier 1.
        let output = "error[E0308]: mismatched types\nerror[E0425]: not found\n2 errors\n";
        assert_eq!(count_errors(output), 2);
    }

    #[test]
    fn summary_fallback_synthesizes_entries() {
        let output = "Compilation finished.\nFound 5 errors in 2 files.\n";
        let lines = extract_error_lines(output);
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("counted from summary"));
    }

    #[test]
    fn summary_fallback_uses_first_match_only() {
        let output = "3 errors generated.\n7 errors in total\n";
        assert_eq!(count_errors(output), 3);
    }

    #[test]
    fn clean_output_counts_zero() {
        let output = "Compiling demo v0.1.0\nFinished dev profile in 1.2s\n";
        assert_eq!(count_errors(output), 0);
    }

    #[test]
    fn indented_error_lines_match_after_trimming() {
        let output = "   error: something broke\n";
        assert_eq!(count_errors(output), 1);
    }

    #[test]
    fn errors_mentioned_mid_line_do_not_match_tier_one() {
        let output = "note: 0 errors emitted so far\n";
        // No leading "error" marker, so tier 2 fires and reads the zero.
        assert_eq!(count_errors(output), 0);
    }
}
