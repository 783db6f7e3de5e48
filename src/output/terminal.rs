// Colored terminal output for the `check` and `rules` commands.

use colored::Colorize;

use crate::moderation::classifier::Classification;
use crate::moderation::normalize::normalize;
use crate::moderation::rules::{ForbiddenPairRule, RuleSet};

/// Display the active rule set.
pub fn display_rules(rules: &RuleSet) {
    println!(
        "\n{}",
        format!("=== Forbidden pairs ({} rules) ===", rules.len()).bold()
    );
    println!();
    println!(
        "  {:<16} {:<16} {:>7}  {}",
        "Term A".dimmed(),
        "Term B".dimmed(),
        "Max gap".dimmed(),
        "Matches as".dimmed(),
    );
    println!("  {}", "-".repeat(60).dimmed());
    for compiled in rules.compiled() {
        let rule = &compiled.rule;
        println!(
            "  {:<16} {:<16} {:>7}  {}",
            rule.term_a,
            rule.term_b,
            rule.max_gap,
            format!("{} ~ {}", compiled.token_a, compiled.token_b).dimmed()
        );
    }
    println!();
    println!(
        "{}",
        "Matching uses normalized tokens (lowercase, leetspeak folded, repeats collapsed).".dimmed()
    );
}

/// Display the lexical filter's view of a message.
pub fn display_lexical_result(message: &str, violations: &[ForbiddenPairRule]) {
    let tokens = normalize(message);
    println!("{} {}", "Tokens:".bold(), tokens.join(" ").dimmed());

    if violations.is_empty() {
        println!("{} {}", "Rules:".bold(), "clean".green());
        return;
    }

    println!(
        "{} {}",
        "Rules:".bold(),
        format!("{} violation(s)", violations.len()).red().bold()
    );
    for rule in violations {
        println!("  {} {} ({})", "!!".red().bold(), rule.id(), rule);
    }
}

/// Display the remote classifier's verdict.
pub fn display_classification(result: &Classification) {
    if !result.blocked {
        println!("{} {}", "Classifier:".bold(), "clean".green());
    } else if result.is_unavailable() {
        println!(
            "{} {}",
            "Classifier:".bold(),
            "unavailable, message would be blocked (503)".yellow()
        );
    } else {
        println!(
            "{} {}",
            "Classifier:".bold(),
            format!("blocked: {}", result.category_names().join(", "))
                .red()
                .bold()
        );
    }
}
