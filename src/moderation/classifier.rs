// Fail-closed wrapper around a moderation provider.
//
// The provider's flags are mapped onto the relay's category vocabulary.
// Any provider error becomes a block with `classifier_unavailable`:
// an unverified message is never treated as safe.

use std::fmt;
use std::sync::Arc;

use tracing::error;

use super::traits::{CategoryFlags, ModerationProvider};

/// Categories the relay blocks on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SafetyCategory {
    Violence,
    Sexual,
    SexualMinors,
    /// The classifier couldn't be reached or gave an unusable answer.
    ClassifierUnavailable,
}

impl SafetyCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyCategory::Violence => "violence",
            SafetyCategory::Sexual => "sexual",
            SafetyCategory::SexualMinors => "sexual_minors",
            SafetyCategory::ClassifierUnavailable => "classifier_unavailable",
        }
    }
}

impl fmt::Display for SafetyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub blocked: bool,
    pub categories: Vec<SafetyCategory>,
}

impl Classification {
    fn from_flags(flags: CategoryFlags) -> Self {
        let categories: Vec<SafetyCategory> = [
            (flags.violence, SafetyCategory::Violence),
            (flags.sexual, SafetyCategory::Sexual),
            (flags.sexual_minors, SafetyCategory::SexualMinors),
        ]
        .into_iter()
        .filter_map(|(flagged, category)| flagged.then_some(category))
        .collect();

        Self {
            blocked: !categories.is_empty(),
            categories,
        }
    }

    fn unavailable() -> Self {
        Self {
            blocked: true,
            categories: vec![SafetyCategory::ClassifierUnavailable],
        }
    }

    /// True when the block came from a classifier failure rather than content.
    pub fn is_unavailable(&self) -> bool {
        self.categories
            .contains(&SafetyCategory::ClassifierUnavailable)
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.to_string()).collect()
    }
}

/// Safety classifier backed by a remote moderation provider.
#[derive(Clone)]
pub struct SafetyClassifier {
    provider: Arc<dyn ModerationProvider>,
}

impl SafetyClassifier {
    pub fn new(provider: Arc<dyn ModerationProvider>) -> Self {
        Self { provider }
    }

    /// Classify the raw message text. Never fails: errors block.
    pub async fn classify(&self, text: &str) -> Classification {
        match self.provider.moderate(text).await {
            Ok(flags) => Classification::from_flags(flags),
            Err(e) => {
                error!(error = %e, "Moderation provider failed, blocking message");
                Classification::unavailable()
            }
        }
    }
}
