// Forbidden word-pair rules.
//
// A rule fires when its two terms appear within `max_gap` tokens of each
// other, in either order. The rule set is built once at startup (built-in
// defaults or a JSON file) and shared read-only afterwards.
//
// Each rule keeps the spelling it was configured with, which is what ids and
// logs show. Matching uses the normalized form, so "sell" in a rule file
// matches "se11" and "selll" in a message: both sides go through `normalize`.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::normalize::normalize;

/// Two terms that must not appear close together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForbiddenPairRule {
    pub term_a: String,
    pub term_b: String,
    /// Maximum number of tokens allowed strictly between the two terms.
    pub max_gap: usize,
}

impl ForbiddenPairRule {
    pub fn new(term_a: &str, term_b: &str, max_gap: usize) -> Self {
        Self {
            term_a: term_a.to_string(),
            term_b: term_b.to_string(),
            max_gap,
        }
    }

    /// Stable identifier used in moderation logs, e.g. `buy-drugs`.
    pub fn id(&self) -> String {
        format!("{}-{}", self.term_a, self.term_b)
    }
}

impl fmt::Display for ForbiddenPairRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ~ {} (max gap {})",
            self.term_a, self.term_b, self.max_gap
        )
    }
}

/// A rule together with the normalized tokens it matches on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub rule: ForbiddenPairRule,
    pub token_a: String,
    pub token_b: String,
}

impl CompiledRule {
    /// Normalize both terms. Each must normalize to exactly one token.
    fn compile(rule: ForbiddenPairRule) -> Result<Self> {
        Ok(Self {
            token_a: single_token(&rule.term_a)?,
            token_b: single_token(&rule.term_b)?,
            rule,
        })
    }
}

fn single_token(term: &str) -> Result<String> {
    let mut tokens = normalize(term);
    if tokens.len() != 1 {
        anyhow::bail!(
            "Rule term {:?} must be a single word, normalizes to {:?}",
            term,
            tokens
        );
    }
    Ok(tokens.remove(0))
}

/// Immutable, shareable set of compiled rules.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Arc<[CompiledRule]>,
}

impl RuleSet {
    /// Build a rule set, normalizing every term for matching.
    pub fn new(rules: Vec<ForbiddenPairRule>) -> Result<Self> {
        let rules = rules
            .into_iter()
            .map(CompiledRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            rules: rules.into(),
        })
    }

    /// The default rules shipped with the relay.
    pub fn builtin() -> Self {
        // (configured terms, gap, normalized tokens)
        let rules: Vec<CompiledRule> = [
            (("buy", "drugs"), 3, ("buy", "drugs")),
            (("sell", "drugs"), 3, ("sel", "drugs")),
            (("hack", "system"), 5, ("hack", "system")),
        ]
        .into_iter()
        .map(|((a, b), max_gap, (token_a, token_b))| CompiledRule {
            rule: ForbiddenPairRule::new(a, b, max_gap),
            token_a: token_a.to_string(),
            token_b: token_b.to_string(),
        })
        .collect();
        Self {
            rules: rules.into(),
        }
    }

    /// Load rules from a JSON array of `{term_a, term_b, max_gap}` objects.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule file {}", path.display()))?;
        Self::from_json(&raw).with_context(|| format!("Invalid rule file {}", path.display()))
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let rules: Vec<ForbiddenPairRule> =
            serde_json::from_str(raw).context("Rule file must be a JSON array of rules")?;
        Self::new(rules)
    }

    /// Load from `path` if given, otherwise the built-in rules.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::builtin()),
        }
    }

    /// Rules as configured.
    pub fn iter(&self) -> impl Iterator<Item = &ForbiddenPairRule> {
        self.rules.iter().map(|compiled| &compiled.rule)
    }

    /// Rules with their matching tokens.
    pub fn compiled(&self) -> impl Iterator<Item = &CompiledRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
