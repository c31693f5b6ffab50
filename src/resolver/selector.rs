//! Picks the parser rule that applies to a model identifier.
//!
//! Enabled rules are evaluated in ascending `(priority, id)` order and the
//! first match wins. The id makes the order total, so two rules sharing a
//! priority resolve the same way no matter how the store returned them.

use serde::Serialize;

use super::matcher::{matches_with, PatternCache};
use crate::catalog::ParserRule;

/// Enabled rules in evaluation order.
pub(crate) fn ordered(rules: &[ParserRule]) -> Vec<&ParserRule> {
    let mut enabled: Vec<&ParserRule> = rules.iter().filter(|rule| rule.enabled).collect();

    enabled.sort_by_key(|rule| (rule.priority, rule.id));

    enabled
}

/// Returns the first enabled rule matching `identifier`, if any.
pub(crate) fn select<'r>(
    identifier: &str,
    rules: &'r [ParserRule],
    cache: Option<&PatternCache>,
) -> Option<&'r ParserRule> {
    ordered(rules)
        .into_iter()
        .find(|rule| matches_with(identifier, rule, cache))
}

/// What happened to a rule during selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub(crate) enum Verdict {
    /// The winning rule.
    Selected,
    /// Evaluated before the winner and did not match.
    NoMatch,
    /// Ordered after the winner, never evaluated.
    Shadowed,
    /// Skipped because it is disabled.
    Disabled,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct Evaluation {
    pub rule: ParserRule,
    pub verdict: Verdict,
}

/// The full selection trace: enabled rules in evaluation order, then disabled
/// rules. At most one entry is [`Verdict::Selected`], and it is the rule
/// [`select`] returns.
pub(crate) fn explain(
    identifier: &str,
    rules: &[ParserRule],
    cache: Option<&PatternCache>,
) -> Vec<Evaluation> {
    let mut trace = Vec::with_capacity(rules.len());
    let mut selected = false;

    for rule in ordered(rules) {
        let verdict = if selected {
            Verdict::Shadowed
        } else if matches_with(identifier, rule, cache) {
            selected = true;
            Verdict::Selected
        } else {
            Verdict::NoMatch
        };

        trace.push(Evaluation {
            rule: rule.clone(),
            verdict,
        });
    }

    let mut disabled: Vec<&ParserRule> = rules.iter().filter(|rule| !rule.enabled).collect();
    disabled.sort_by_key(|rule| (rule.priority, rule.id));

    trace.extend(disabled.into_iter().map(|rule| Evaluation {
        rule: rule.clone(),
        verdict: Verdict::Disabled,
    }));

    trace
}
