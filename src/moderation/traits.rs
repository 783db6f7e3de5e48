// Moderation provider trait. Remote classifiers plug in here.
//
// A provider answers with raw category flags; mapping those to blocking
// decisions (and failing closed on errors) is the SafetyClassifier's job,
// so a new provider only has to report what the service said.

use anyhow::Result;
use async_trait::async_trait;

/// Category flags reported by a moderation service.
/// Providers that don't support a category leave it `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryFlags {
    pub violence: bool,
    pub sexual: bool,
    pub sexual_minors: bool,
}

/// Remote content classification capability.
#[async_trait]
pub trait ModerationProvider: Send + Sync {
    /// Classify raw (non-normalized) message text.
    async fn moderate(&self, text: &str) -> Result<CategoryFlags>;
}
