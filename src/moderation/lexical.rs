// Rule-based lexical filter.
//
// Normalizes the message and checks every forbidden pair against the token
// positions. Each violated rule is reported once, in rule-set order, no
// matter how many occurrence pairs triggered it, so log consumers can count
// categories without de-duplicating.

use tracing::debug;

use super::normalize::normalize;
use super::rules::{CompiledRule, ForbiddenPairRule, RuleSet};

/// Proximity filter over a fixed rule set.
#[derive(Debug, Clone)]
pub struct LexicalFilter {
    rules: RuleSet,
}

impl LexicalFilter {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Return the rules the text violates. Empty means lexically clean.
    pub fn scan(&self, text: &str) -> Vec<ForbiddenPairRule> {
        let tokens = normalize(text);
        let violations: Vec<ForbiddenPairRule> = self
            .rules
            .compiled()
            .filter(|compiled| violates(&tokens, compiled))
            .map(|compiled| compiled.rule.clone())
            .collect();

        if !violations.is_empty() {
            debug!(
                tokens = tokens.len(),
                violations = violations.len(),
                "Lexical filter matched"
            );
        }
        violations
    }
}

impl Default for LexicalFilter {
    fn default() -> Self {
        Self::new(RuleSet::builtin())
    }
}

/// True if some occurrence of `token_a` and some occurrence of `token_b`
/// have at most `max_gap` tokens between them.
fn violates(tokens: &[String], compiled: &CompiledRule) -> bool {
    let positions = |term: &str| -> Vec<usize> {
        tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.as_str() == term)
            .map(|(i, _)| i)
            .collect()
    };

    let a = positions(&compiled.token_a);
    if a.is_empty() {
        return false;
    }
    let b = positions(&compiled.token_b);
    let max_gap = compiled.rule.max_gap;

    a.iter().any(|&i| {
        b.iter()
            // A single token can't be both ends of a pair
            .filter(|&&j| j != i)
            .any(|&j| i.abs_diff(j) - 1 <= max_gap)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(rules: Vec<ForbiddenPairRule>) -> LexicalFilter {
        LexicalFilter::new(RuleSet::new(rules).unwrap())
    }

    #[test]
    fn test_adjacent_terms_have_zero_gap() {
        let f = filter(vec![ForbiddenPairRule::new("buy", "drugs", 0)]);
        assert_eq!(f.scan("buy drugs").len(), 1);
        assert!(f.scan("buy some drugs").is_empty());
    }

    #[test]
    fn test_order_does_not_matter() {
        let f = filter(vec![ForbiddenPairRule::new("buy", "drugs", 1)]);
        assert_eq!(f.scan("drugs to buy").len(), 1);
    }

    #[test]
    fn test_repeated_occurrences_report_rule_once() {
        let f = filter(vec![ForbiddenPairRule::new("buy", "drugs", 3)]);
        let violations = f.scan("buy drugs, buy drugs, buy more drugs");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].id(), "buy-drugs");
    }

    #[test]
    fn test_any_close_pair_is_enough() {
        let f = filter(vec![ForbiddenPairRule::new("buy", "drugs", 1)]);
        // First "buy" is far away, second one is adjacent
        assert_eq!(f.scan("buy a b c d e f drugs buy").len(), 1);
    }

    #[test]
    fn test_same_term_rule_needs_two_occurrences() {
        let f = filter(vec![ForbiddenPairRule::new("kill", "kill", 2)]);
        assert!(f.scan("kill").is_empty());
        assert_eq!(f.scan("kill it, kill").len(), 1);
    }

    #[test]
    fn test_violation_reports_configured_spelling() {
        let f = filter(vec![ForbiddenPairRule::new("Steal", "PASSWORD", 2)]);
        let violations = f.scan("steal my pasword");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].id(), "Steal-PASSWORD");
    }

    #[test]
    fn test_violations_follow_rule_order() {
        let f = LexicalFilter::default();
        let violations = f.scan("hack the system then sell drugs");
        let ids: Vec<String> = violations.iter().map(ForbiddenPairRule::id).collect();
        assert_eq!(ids, vec!["sell-drugs", "hack-system"]);
    }

    #[test]
    fn test_empty_text_is_clean() {
        assert!(LexicalFilter::default().scan("").is_empty());
    }
}
