//! Evaluates one parser rule's pattern against a model identifier.
//!
//! `regex` patterns are anchored at the start of the identifier only, so
//! `meta-llama/.*-Instruct` matches `meta-llama/Llama-3.1-8B-Instruct-FP8`. A
//! pattern that fails to compile never matches; the failure is logged and the
//! caller moves on to the next rule.

use regex::Regex;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use crate::catalog::{MatchType, ParserRule};

/// The raw pattern has to compile on its own before it is wrapped, otherwise a
/// pattern such as `a)(b` would close the anchoring group and become valid.
fn compile(rule: &ParserRule) -> Option<Regex> {
    let anchored = Regex::new(&rule.pattern)
        .and_then(|_| Regex::new(&format!("^(?:{})", rule.pattern)));

    match anchored {
        Ok(re) => Some(re),
        Err(err) => {
            tracing::warn!(
                rule_id = %rule.id,
                pattern = %rule.pattern,
                error = %err,
                "parser rule has a malformed regex, treating it as non-matching"
            );
            None
        }
    }
}

/// Compiled regex patterns, keyed by pattern text.
///
/// The cache is owned by whoever builds the resolver and is shared by all
/// resolutions made through it. Compile failures are cached too, so a broken
/// rule is only reported once. Entries are keyed by pattern text, so a cache
/// never goes stale when a catalog is reloaded.
#[derive(Debug, Default)]
pub(crate) struct PatternCache {
    compiled: RwLock<HashMap<String, Option<Regex>>>,
}

impl PatternCache {
    pub(crate) fn new() -> PatternCache {
        PatternCache::default()
    }

    fn get_or_compile(&self, rule: &ParserRule) -> Option<Regex> {
        {
            let compiled = self.compiled.read().unwrap_or_else(PoisonError::into_inner);

            if let Some(entry) = compiled.get(&rule.pattern) {
                return entry.clone();
            }
        }

        let mut compiled = self.compiled.write().unwrap_or_else(PoisonError::into_inner);

        compiled
            .entry(rule.pattern.clone())
            .or_insert_with(|| compile(rule))
            .clone()
    }
}

#[cfg(test)]
impl PatternCache {
    /// Drops the entry for `pattern`. Returns whether one was present.
    pub(crate) fn invalidate(&self, pattern: &str) -> bool {
        self.compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(pattern)
            .is_some()
    }

    pub(crate) fn clear(&self) {
        self.compiled
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.compiled
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Whether `rule` matches `identifier`. Compiles regex patterns on every call.
#[cfg(test)]
pub(crate) fn matches(identifier: &str, rule: &ParserRule) -> bool {
    matches_with(identifier, rule, None)
}

/// Whether `rule` matches `identifier`, reusing compiled patterns from `cache`
/// when given.
pub(crate) fn matches_with(identifier: &str, rule: &ParserRule, cache: Option<&PatternCache>) -> bool {
    match rule.match_type {
        MatchType::Exact => identifier == rule.pattern,
        MatchType::Prefix => identifier.starts_with(&rule.pattern),
        MatchType::Regex => {
            let re = match cache {
                Some(cache) => cache.get_or_compile(rule),
                None => compile(rule),
            };

            re.map_or(false, |re| re.is_match(identifier))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::RuleType;
    use uuid::Uuid;

    pub(crate) fn rule(id: u128, priority: i32, match_type: MatchType, pattern: &str, parser: &str) -> ParserRule {
        ParserRule {
            id: Uuid::from_u128(id),
            engine_id: Uuid::nil(),
            rule_type: RuleType::Tool,
            match_type,
            pattern: pattern.to_string(),
            priority,
            enabled: true,
            parser_type: Some(parser.to_string()),
            chat_template: None,
            notes: None,
        }
    }

    #[test]
    fn exact_and_prefix() {
        let exact = rule(1, 0, MatchType::Exact, "gpt-4", "openai");
        assert!(matches("gpt-4", &exact));
        assert!(!matches("gpt-4o", &exact));
        assert!(!matches("GPT-4", &exact));

        let prefix = rule(2, 0, MatchType::Prefix, "gpt-", "hermes");
        assert!(matches("gpt-4", &prefix));
        assert!(matches("gpt-", &prefix));
        assert!(!matches("my-gpt-4", &prefix));
    }

    #[test]
    fn regex_is_anchored_at_start_only() {
        let ends_in_b = rule(1, 0, MatchType::Regex, "^llama-3-.*b$", "llama3_json");
        let ends_in_c = rule(2, 0, MatchType::Regex, "^llama-3-.*c$", "llama3_json");

        assert!(matches("llama-3-70b", &ends_in_b));
        assert!(!matches("llama-3-70b", &ends_in_c));

        let unanchored = rule(3, 0, MatchType::Regex, "llama", "llama3_json");
        assert!(matches("llama-3-70b-instruct", &unanchored));
        assert!(!matches("meta-llama-3", &unanchored));
    }

    #[test]
    fn alternation_stays_anchored() {
        let alt = rule(1, 0, MatchType::Regex, "qwen|llama", "hermes");

        assert!(matches("llama-3", &alt));
        assert!(!matches("big-llama", &alt));
    }

    #[test]
    fn malformed_regex_never_matches() {
        let broken = rule(1, 0, MatchType::Regex, "mistralai/(", "mistral");

        assert!(!matches("mistralai/(", &broken));
        assert!(!matches("mistralai/Mistral-7B", &broken));
    }

    #[test]
    fn pattern_cannot_escape_the_anchor_group() {
        let unbalanced = rule(1, 0, MatchType::Regex, "a)(b", "hermes");
        assert!(Regex::new("a)(b").is_err());
        assert!(!matches("ab", &unbalanced));
        assert!(!matches("a)(b", &unbalanced));

        let escaping = rule(2, 0, MatchType::Regex, "x)|(y", "hermes");
        assert!(!matches("zzz-y", &escaping));
        assert!(!matches("y", &escaping));
        assert!(!matches("x", &escaping));

        let cache = PatternCache::new();
        assert!(!matches_with("zzz-y", &escaping, Some(&cache)));
        assert!(!matches_with("ab", &unbalanced, Some(&cache)));
    }

    #[test]
    fn cache_reuses_and_invalidates() {
        let cache = PatternCache::new();
        let qwen = rule(1, 0, MatchType::Regex, "Qwen/Qwen2\\.5-.*", "hermes");
        let broken = rule(2, 0, MatchType::Regex, "(", "broken");

        assert!(matches_with("Qwen/Qwen2.5-7B-Instruct", &qwen, Some(&cache)));
        assert!(!matches_with("Qwen/Qwen2-7B", &qwen, Some(&cache)));
        assert!(!matches_with("(", &broken, Some(&cache)));
        assert_eq!(cache.len(), 2);

        assert!(cache.invalidate("("));
        assert!(!cache.invalidate("("));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn cache_is_shared_across_threads() {
        let cache = std::sync::Arc::new(PatternCache::new());
        let qwen = rule(1, 0, MatchType::Regex, "Qwen/", "hermes");

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                let qwen = qwen.clone();
                std::thread::spawn(move || matches_with("Qwen/QwQ-32B", &qwen, Some(&cache)))
            })
            .collect();

        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(cache.len(), 1);
    }
}
