//! Query evaluator.
//!
//! Applies the resolved effective policy list to an incoming query, in the
//! resolver's order. The verdict is the highest restrictiveness encountered:
//! any block denies the query; redact matches produce a deterministically
//! redacted copy of the text; warn and log matches are recorded only.

use crate::resolver::EffectivePolicy;
use dashmap::DashMap;
use gatehouse_core::{PolicyAction, Verdict, MATCH_BUDGET_MS};
use regex::Regex;
use std::time::{Duration, Instant};

/// Fixed, non-reversible replacement for redacted spans.
pub const REDACTION_MARKER: &str = "[REDACTED]";

/// A rule that matched the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggeredRule {
    pub policy_id: String,
    pub action: PolicyAction,
    pub match_count: usize,
}

/// Outcome of evaluating a query against the effective policy list.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub verdict: Verdict,
    /// Policy ids evaluated, in evaluation order
    pub evaluated_policies: Vec<String>,
    /// Rules that matched, with their effective actions
    pub triggered: Vec<TriggeredRule>,
    /// Rules whose match attempt exceeded the budget (degraded to log)
    pub timed_out: Vec<String>,
    /// Redacted copy of the query when redact rules matched and the query
    /// was not denied
    pub redacted_text: Option<String>,
    /// Set when the verdict is denied
    pub block_reason: Option<String>,
}

/// Evaluator with a compiled-pattern cache.
///
/// Patterns are cached by `(policy_id, version)`: a policy update bumps the
/// version and naturally invalidates the stale entry.
pub struct Evaluator {
    cache: DashMap<(String, i32), Regex>,
    budget: Duration,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Create an evaluator with the default per-policy budget.
    pub fn new() -> Self {
        Self {
            cache: DashMap::new(),
            budget: Duration::from_millis(MATCH_BUDGET_MS),
        }
    }

    /// Override the per-policy budget (tests).
    pub fn with_budget(budget: Duration) -> Self {
        Self {
            cache: DashMap::new(),
            budget,
        }
    }

    /// Evaluate a query against the ordered effective policy list.
    pub fn evaluate(&self, policies: &[EffectivePolicy], query: &str) -> Evaluation {
        let mut evaluated_policies = Vec::new();
        let mut triggered = Vec::new();
        let mut timed_out = Vec::new();
        let mut redact_spans: Vec<(usize, usize)> = Vec::new();
        let mut block_reason = None;

        for effective in policies.iter().filter(|e| e.enabled) {
            let policy = &effective.policy;
            let compiled = match self.compiled(policy.policy_id.as_str(), policy.version, &policy.pattern) {
                Some(re) => re,
                None => {
                    // Validated at create time; a compile failure here means
                    // corrupted storage. Skip rather than fail the request.
                    tracing::warn!(policy_id = %policy.policy_id, "Stored pattern failed to compile");
                    continue;
                }
            };
            evaluated_policies.push(policy.policy_id.clone());

            let started = Instant::now();
            let matches: Vec<(usize, usize)> = compiled
                .find_iter(query)
                .map(|m| (m.start(), m.end()))
                .collect();
            if started.elapsed() > self.budget {
                // Degrade to log; a slow pattern alone never blocks.
                tracing::warn!(
                    policy_id = %policy.policy_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Pattern evaluation exceeded budget, degrading to log"
                );
                timed_out.push(policy.policy_id.clone());
                continue;
            }
            if matches.is_empty() {
                continue;
            }

            match effective.action {
                PolicyAction::Block => {
                    if block_reason.is_none() {
                        block_reason = Some(format!(
                            "query blocked by policy {} ({})",
                            policy.policy_id, policy.name
                        ));
                    }
                }
                PolicyAction::Redact => redact_spans.extend(matches.iter().copied()),
                PolicyAction::Warn | PolicyAction::Log => {}
            }
            triggered.push(TriggeredRule {
                policy_id: policy.policy_id.clone(),
                action: effective.action,
                match_count: matches.len(),
            });
        }

        let verdict = if block_reason.is_some() {
            Verdict::Denied
        } else {
            Verdict::Approved
        };
        let redacted_text = if verdict.is_approved() && !redact_spans.is_empty() {
            Some(redact(query, redact_spans))
        } else {
            None
        };

        Evaluation {
            verdict,
            evaluated_policies,
            triggered,
            timed_out,
            redacted_text,
            block_reason,
        }
    }

    fn compiled(&self, policy_id: &str, version: i32, pattern: &str) -> Option<Regex> {
        let key = (policy_id.to_string(), version);
        if let Some(re) = self.cache.get(&key) {
            return Some(re.clone());
        }
        let re = Regex::new(pattern).ok()?;
        self.cache.insert(key, re.clone());
        Some(re)
    }
}

/// Replace every matched span with the redaction marker.
///
/// Overlapping or adjacent spans are merged first, then replaced
/// right-to-left so earlier offsets stay valid. The result is deterministic
/// for a given input and span set.
fn redact(text: &str, mut spans: Vec<(usize, usize)>) -> String {
    spans.sort();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some((_, last_end)) if start <= *last_end => *last_end = (*last_end).max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut out = text.to_string();
    for (start, end) in merged.into_iter().rev() {
        out.replace_range(start..end, REDACTION_MARKER);
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gatehouse_core::{
        PolicyCategory, PolicyTier, Severity, StaticPolicy,
    };

    fn effective(
        policy_id: &str,
        pattern: &str,
        action: PolicyAction,
        priority: i32,
    ) -> EffectivePolicy {
        let policy = StaticPolicy::new(
            policy_id,
            format!("rule {}", policy_id),
            PolicyCategory::PiiGlobal,
            PolicyTier::System,
            pattern,
            action,
            Severity::High,
            "global",
            "system",
        )
        .with_priority(priority);
        EffectivePolicy {
            action: policy.action,
            enabled: policy.enabled,
            overridden: false,
            policy,
        }
    }

    #[test]
    fn test_clean_query_is_approved() {
        let evaluator = Evaluator::new();
        let rules = vec![effective("r1", r"\bssn\b", PolicyAction::Block, 90)];
        let result = evaluator.evaluate(&rules, "What is the capital of France?");

        assert_eq!(result.verdict, Verdict::Approved);
        assert!(result.triggered.is_empty());
        assert!(result.redacted_text.is_none());
        assert!(result.block_reason.is_none());
        assert_eq!(result.evaluated_policies, vec!["r1"]);
    }

    #[test]
    fn test_block_match_denies() {
        let evaluator = Evaluator::new();
        let rules = vec![
            effective("r_warn", r"\bdrop\b", PolicyAction::Warn, 50),
            effective("r_block", r"\bdrop\s+table\b", PolicyAction::Block, 90),
        ];
        let result = evaluator.evaluate(&rules, "please drop table users");

        assert_eq!(result.verdict, Verdict::Denied);
        let reason = result.block_reason.unwrap();
        assert!(reason.contains("r_block"));
        assert!(result.redacted_text.is_none());
        assert_eq!(result.triggered.len(), 2);
    }

    #[test]
    fn test_redaction_is_deterministic_and_merged() {
        let evaluator = Evaluator::new();
        let rules = vec![
            effective("r_digits", r"\d{3}-\d{2}-\d{4}", PolicyAction::Redact, 80),
            // Overlapping rule matching the leading digits
            effective("r_prefix", r"\d{3}-\d{2}", PolicyAction::Redact, 70),
        ];
        let query = "ssn 123-45-6789 and again 987-65-4321 end";
        let result = evaluator.evaluate(&rules, query);

        assert_eq!(result.verdict, Verdict::Approved);
        let redacted = result.redacted_text.unwrap();
        assert_eq!(redacted, "ssn [REDACTED] and again [REDACTED] end");

        // Same input, same output.
        let again = evaluator.evaluate(&rules, query);
        assert_eq!(again.redacted_text.as_deref(), Some(redacted.as_str()));
    }

    #[test]
    fn test_highest_restrictiveness_wins() {
        let evaluator = Evaluator::new();
        let rules = vec![
            effective("r_redact", r"secret", PolicyAction::Redact, 80),
            effective("r_block", r"forbidden", PolicyAction::Block, 90),
        ];

        // Redact only: approved with redaction.
        let result = evaluator.evaluate(&rules, "a secret here");
        assert_eq!(result.verdict, Verdict::Approved);
        assert!(result.redacted_text.is_some());

        // Block beats redact; no redacted text is produced for a denial.
        let result = evaluator.evaluate(&rules, "a secret and a forbidden word");
        assert_eq!(result.verdict, Verdict::Denied);
        assert!(result.redacted_text.is_none());
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let evaluator = Evaluator::new();
        let mut rule = effective("r1", r"secret", PolicyAction::Block, 90);
        rule.enabled = false;
        let result = evaluator.evaluate(&[rule], "a secret here");

        assert_eq!(result.verdict, Verdict::Approved);
        assert!(result.evaluated_policies.is_empty());
    }

    #[test]
    fn test_evaluation_order_matches_input_order() {
        let evaluator = Evaluator::new();
        let rules = vec![
            effective("first", r"a", PolicyAction::Log, 90),
            effective("second", r"b", PolicyAction::Log, 80),
            effective("third", r"c", PolicyAction::Log, 70),
        ];
        let result = evaluator.evaluate(&rules, "abc");
        assert_eq!(result.evaluated_policies, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_timeout_degrades_to_log() {
        // A zero budget forces every rule over the line.
        let evaluator = Evaluator::with_budget(Duration::ZERO);
        let rules = vec![effective("r_block", r"secret", PolicyAction::Block, 90)];
        let result = evaluator.evaluate(&rules, "a secret here");

        assert_eq!(result.verdict, Verdict::Approved);
        assert_eq!(result.timed_out, vec!["r_block"]);
        assert!(result.triggered.is_empty());
    }

    #[test]
    fn test_warn_and_log_do_not_alter_text() {
        let evaluator = Evaluator::new();
        let rules = vec![
            effective("r_warn", r"alpha", PolicyAction::Warn, 60),
            effective("r_log", r"beta", PolicyAction::Log, 50),
        ];
        let result = evaluator.evaluate(&rules, "alpha beta");

        assert_eq!(result.verdict, Verdict::Approved);
        assert!(result.redacted_text.is_none());
        assert_eq!(result.triggered.len(), 2);
    }

    #[test]
    fn test_redact_helper_merges_adjacent_spans() {
        assert_eq!(redact("abcdef", vec![(0, 2), (2, 4)]), "[REDACTED]ef");
        assert_eq!(redact("abcdef", vec![(4, 6), (0, 2)]), "[REDACTED]cd[REDACTED]");
        assert_eq!(redact("abcdef", vec![(1, 5), (2, 3)]), "a[REDACTED]f");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Redaction removes every match: re-running the rule on the
            /// redacted text finds nothing, and the output is stable.
            #[test]
            fn prop_redaction_is_complete_and_deterministic(
                input in "[a-zA-Z0-9 :;-]{0,120}"
            ) {
                let evaluator = Evaluator::new();
                let rules = vec![effective(
                    "r_ssn",
                    r"\d{3}-\d{2}-\d{4}",
                    PolicyAction::Redact,
                    80,
                )];
                let first = evaluator.evaluate(&rules, &input);
                let second = evaluator.evaluate(&rules, &input);
                prop_assert_eq!(&first, &second);

                if let Some(redacted) = &first.redacted_text {
                    let re = regex::Regex::new(r"\d{3}-\d{2}-\d{4}").unwrap();
                    prop_assert!(!re.is_match(redacted));
                    prop_assert!(redacted.contains(REDACTION_MARKER));
                }
            }
        }
    }
}
