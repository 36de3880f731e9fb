//! Pattern validation and testing.
//!
//! User-authored patterns run against user-controlled queries, so every
//! pattern must be safe by construction: bounded length, bounded capture
//! groups, no ambiguous nested quantifiers, and a linear-time engine
//! underneath. The `regex` crate guarantees worst-case linear matching
//! (Thompson NFA); backtracking dialects are not acceptable here.

use gatehouse_core::{PatternError, MATCH_BUDGET_MS, MAX_CAPTURE_GROUPS, MAX_PATTERN_LENGTH};
use regex::Regex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Validate a pattern against the authoring rules.
///
/// Checks, in order: non-blank, length cap, dangerous shape, syntax,
/// capture-group cap. A pattern that passes here is safe to evaluate
/// against any input within the service ceiling.
pub fn validate(pattern: &str) -> Result<(), PatternError> {
    if pattern.trim().is_empty() {
        return Err(PatternError::Empty);
    }
    if pattern.len() > MAX_PATTERN_LENGTH {
        return Err(PatternError::TooLong {
            length: pattern.len(),
            max: MAX_PATTERN_LENGTH,
        });
    }
    if let Some(construct) = nested_unbounded_quantifier(pattern) {
        return Err(PatternError::DangerousShape { construct });
    }
    let compiled = Regex::new(pattern).map_err(|e| PatternError::InvalidSyntax {
        reason: e.to_string(),
    })?;
    let group_count = compiled.captures_len() - 1; // exclude implicit group 0
    if group_count > MAX_CAPTURE_GROUPS {
        return Err(PatternError::TooManyGroups {
            count: group_count,
            max: MAX_CAPTURE_GROUPS,
        });
    }
    Ok(())
}

/// Validate and compile a pattern.
pub fn compile(pattern: &str) -> Result<Regex, PatternError> {
    validate(pattern)?;
    Regex::new(pattern).map_err(|e| PatternError::InvalidSyntax {
        reason: e.to_string(),
    })
}

// ============================================================================
// DANGEROUS-SHAPE DETECTION
// ============================================================================

/// Detect a group ending in an unbounded quantifier that directly feeds
/// another unbounded quantifier: `(.*)+`, `(.+)+`, `(a*)*`, `(?:x+){2,}`.
///
/// The engine would handle these in linear time anyway; rejecting them is a
/// policy against ambiguous authoring. Returns the offending snippet.
fn nested_unbounded_quantifier(pattern: &str) -> Option<String> {
    let chars: Vec<char> = pattern.chars().collect();
    let mut escaped = false;
    let mut in_class = false;

    for i in 0..chars.len() {
        let c = chars[i];
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            ')' if !in_class => {
                if unbounded_at(&chars, i + 1) && inner_ends_unbounded(&chars, i) {
                    let snippet = snippet_around(&chars, i);
                    return Some(snippet);
                }
            }
            _ => {}
        }
    }
    None
}

/// Whether an unbounded quantifier (`*`, `+`, or `{m,}`) starts at `idx`.
fn unbounded_at(chars: &[char], idx: usize) -> bool {
    match chars.get(idx) {
        Some('*') | Some('+') => true,
        Some('{') => {
            // `{m,}` with no upper bound
            let mut j = idx + 1;
            let mut saw_digit = false;
            while let Some(d) = chars.get(j) {
                if d.is_ascii_digit() {
                    saw_digit = true;
                    j += 1;
                } else {
                    break;
                }
            }
            saw_digit && chars.get(j) == Some(&',') && chars.get(j + 1) == Some(&'}')
        }
        _ => false,
    }
}

/// Count of consecutive backslashes immediately before `idx` is odd, i.e.
/// the char at `idx` is escaped.
fn is_escaped(chars: &[char], idx: usize) -> bool {
    let mut backslashes = 0;
    let mut j = idx;
    while j > 0 && chars[j - 1] == '\\' {
        backslashes += 1;
        j -= 1;
    }
    backslashes % 2 == 1
}

/// Whether the group closing at `close_idx` ends with an unbounded
/// quantifier (optionally lazy).
fn inner_ends_unbounded(chars: &[char], close_idx: usize) -> bool {
    if close_idx == 0 {
        return false;
    }
    let mut last = close_idx - 1;
    // Skip a lazy marker: `(.*?)+` is still nested-unbounded.
    if chars[last] == '?' && last > 0 {
        last -= 1;
    }
    if is_escaped(chars, last) {
        // `(\*)` ends in a literal asterisk, not a quantifier.
        return false;
    }
    match chars[last] {
        '*' | '+' => true,
        '}' => {
            // Walk back to the matching '{' and re-check for `{m,}`.
            let mut j = last;
            while j > 0 && chars[j] != '{' {
                j -= 1;
            }
            chars[j] == '{' && unbounded_at(chars, j)
        }
        _ => false,
    }
}

/// Short window of the pattern around the offending position, for the error
/// message.
fn snippet_around(chars: &[char], idx: usize) -> String {
    let start = idx.saturating_sub(8);
    let end = (idx + 4).min(chars.len());
    chars[start..end].iter().collect()
}

// ============================================================================
// PATTERN TESTING
// ============================================================================

/// Result of running a pattern against one input.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    /// Full text of the first match
    pub matched_text: Option<String>,
    /// Ordered capture groups (up to the group cap); None for non-participating groups
    pub groups: Vec<Option<String>>,
    /// Byte offset where the match starts
    pub start: Option<usize>,
    /// Byte offset where the match ends
    pub end: Option<usize>,
    /// Per-input failure ("timeout"), never aborts the batch
    pub error: Option<String>,
}

impl MatchOutcome {
    fn no_match() -> Self {
        Self {
            matched: false,
            matched_text: None,
            groups: Vec::new(),
            start: None,
            end: None,
            error: None,
        }
    }

    fn timeout() -> Self {
        Self {
            error: Some("timeout".to_string()),
            ..Self::no_match()
        }
    }
}

/// Outcome of a pattern test batch.
#[derive(Debug, Clone, PartialEq)]
pub struct TestReport {
    /// One outcome per input, in input order. Shorter than the input list
    /// when the batch was cancelled mid-way.
    pub results: Vec<MatchOutcome>,
    /// Whether the caller cancelled the batch before it finished
    pub cancelled: bool,
}

/// Run a pattern against a batch of inputs.
///
/// Each input gets a hard wall-clock budget; an input that exceeds it is
/// reported as `{matched: false, error: "timeout"}` without aborting the
/// batch. The caller's cancellation flag is checked between inputs;
/// already-computed results are returned with the `cancelled` marker set.
pub fn test(
    pattern: &str,
    inputs: &[&str],
    budget: Option<Duration>,
    cancel: &AtomicBool,
) -> Result<TestReport, PatternError> {
    let compiled = compile(pattern)?;
    let budget = budget.unwrap_or(Duration::from_millis(MATCH_BUDGET_MS));

    let mut results = Vec::with_capacity(inputs.len());
    for input in inputs {
        if cancel.load(Ordering::Relaxed) {
            return Ok(TestReport {
                results,
                cancelled: true,
            });
        }
        results.push(run_one(&compiled, input, budget));
    }
    Ok(TestReport {
        results,
        cancelled: false,
    })
}

/// Match a single input under the wall-clock budget.
///
/// The engine is worst-case linear, so a single match cannot hang; the
/// budget is enforced by measuring elapsed time around the match and
/// reporting a timeout when it is exceeded.
fn run_one(compiled: &Regex, input: &str, budget: Duration) -> MatchOutcome {
    let started = Instant::now();
    let captures = compiled.captures(input);
    if started.elapsed() > budget {
        return MatchOutcome::timeout();
    }

    match captures {
        None => MatchOutcome::no_match(),
        Some(caps) => {
            let full = caps.get(0).expect("group 0 always participates");
            let groups = caps
                .iter()
                .skip(1)
                .take(MAX_CAPTURE_GROUPS)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect();
            MatchOutcome {
                matched: true,
                matched_text: Some(full.as_str().to_string()),
                groups,
                start: Some(full.start()),
                end: Some(full.end()),
                error: None,
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn no_cancel() -> AtomicBool {
        AtomicBool::new(false)
    }

    #[test]
    fn test_validate_accepts_word_boundary_pattern() {
        assert!(validate(r"\btest\b").is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_and_blank() {
        assert_eq!(validate(""), Err(PatternError::Empty));
        assert_eq!(validate("   "), Err(PatternError::Empty));
    }

    #[test]
    fn test_validate_length_boundary() {
        // Exactly at the cap: accepted.
        let at_cap = "a".repeat(MAX_PATTERN_LENGTH);
        assert!(validate(&at_cap).is_ok());

        // One over: rejected.
        let over = "a".repeat(MAX_PATTERN_LENGTH + 1);
        assert_eq!(
            validate(&over),
            Err(PatternError::TooLong {
                length: MAX_PATTERN_LENGTH + 1,
                max: MAX_PATTERN_LENGTH
            })
        );
    }

    #[test]
    fn test_validate_group_boundary() {
        // Exactly 10 groups: accepted.
        let ten = "(a)".repeat(MAX_CAPTURE_GROUPS);
        assert!(validate(&ten).is_ok());

        // 11 groups: rejected.
        let eleven = "(a)".repeat(MAX_CAPTURE_GROUPS + 1);
        assert_eq!(
            validate(&eleven),
            Err(PatternError::TooManyGroups {
                count: MAX_CAPTURE_GROUPS + 1,
                max: MAX_CAPTURE_GROUPS
            })
        );
    }

    #[test]
    fn test_validate_invalid_syntax() {
        let err = validate("[invalid").unwrap_err();
        assert!(matches!(err, PatternError::InvalidSyntax { .. }));
        assert_eq!(err.code(), "invalid_syntax");
    }

    #[test]
    fn test_validate_dangerous_shapes() {
        for pattern in ["(.*)+", "(.+)+", "(a*)*", "(a+)*", "(?:b+)+", "(.*?)+", "(x+){2,}"] {
            let err = validate(pattern).unwrap_err();
            assert!(
                matches!(err, PatternError::DangerousShape { .. }),
                "{} should be dangerous, got {:?}",
                pattern,
                err
            );
        }
    }

    #[test]
    fn test_validate_safe_quantifier_shapes() {
        // Bounded or non-nested quantifiers are fine.
        for pattern in ["(a|b)+", "(ab)*c", "(a{2,5})+", r"(\d+)-(\d+)", "a+b*", "(a+)?"] {
            assert!(validate(pattern).is_ok(), "{} should be accepted", pattern);
        }
    }

    #[test]
    fn test_escaped_paren_is_not_a_group() {
        // `\)+` after a literal paren must not trip the detector.
        assert!(validate(r"a+\)+").is_ok());
    }

    #[test]
    fn test_escaped_star_inside_group_is_literal() {
        assert!(validate(r"(\*)+").is_ok());
        // But an escaped backslash before a real quantifier still nests.
        assert!(matches!(
            validate(r"(a\\+)+"),
            Err(PatternError::DangerousShape { .. })
        ));
    }

    #[test]
    fn test_compile_matches() {
        let re = compile(r"\bPAN\b").unwrap();
        assert!(re.is_match("Customer PAN is ABCPD1234F"));
    }

    #[test]
    fn test_batch_reports_matches_and_offsets() {
        let cancel = no_cancel();
        let report = test(
            r"(\d{3})-(\d{2})",
            &["call 123-45 now", "nothing here"],
            None,
            &cancel,
        )
        .unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.results.len(), 2);

        let hit = &report.results[0];
        assert!(hit.matched);
        assert_eq!(hit.matched_text.as_deref(), Some("123-45"));
        assert_eq!(hit.start, Some(5));
        assert_eq!(hit.end, Some(11));
        assert_eq!(
            hit.groups,
            vec![Some("123".to_string()), Some("45".to_string())]
        );

        let miss = &report.results[1];
        assert!(!miss.matched);
        assert!(miss.error.is_none());
    }

    #[test]
    fn test_batch_cancellation_returns_partial_results() {
        let cancel = AtomicBool::new(true);
        let report = test(r"a", &["a", "b", "c"], None, &cancel).unwrap();
        assert!(report.cancelled);
        assert!(report.results.is_empty());
    }

    #[test]
    fn test_batch_rejects_invalid_pattern_upfront() {
        let cancel = no_cancel();
        assert!(matches!(
            test("(.*)+", &["x"], None, &cancel),
            Err(PatternError::DangerousShape { .. })
        ));
    }

    #[test]
    fn test_non_participating_groups_are_none() {
        let cancel = no_cancel();
        let report = test(r"(a)|(b)", &["b"], None, &cancel).unwrap();
        let outcome = &report.results[0];
        assert!(outcome.matched);
        assert_eq!(outcome.groups, vec![None, Some("b".to_string())]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Validation is total: any input string produces a verdict, and
            /// an accepted pattern always compiles within the group cap.
            #[test]
            fn prop_validate_is_total(pattern in "\\PC{0,120}") {
                if validate(&pattern).is_ok() {
                    let compiled = Regex::new(&pattern).expect("accepted pattern must compile");
                    prop_assert!(compiled.captures_len() - 1 <= MAX_CAPTURE_GROUPS);
                }
            }

            /// A matched span always lies within the input and round-trips
            /// through the reported offsets.
            #[test]
            fn prop_match_offsets_are_consistent(input in "[a-z0-9 .-]{0,80}") {
                let cancel = AtomicBool::new(false);
                let report = test(r"\d{2,4}", &[input.as_str()], None, &cancel).unwrap();
                let outcome = &report.results[0];
                if outcome.matched {
                    let (start, end) = (outcome.start.unwrap(), outcome.end.unwrap());
                    prop_assert!(end <= input.len());
                    prop_assert_eq!(
                        outcome.matched_text.as_deref().unwrap(),
                        &input[start..end]
                    );
                }
            }
        }
    }
}
