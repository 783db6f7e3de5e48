// Moderation verdicts and the moderation log.
//
// A verdict is produced once per blocked message and written to the log
// under the `chatguard::moderation` target. Nothing reads it back.

use std::fmt;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

/// Which stage produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictSource {
    Rule,
    External,
}

impl fmt::Display for VerdictSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictSource::Rule => write!(f, "rule"),
            VerdictSource::External => write!(f, "external"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModerationVerdict {
    pub blocked: bool,
    pub source: VerdictSource,
    /// Rule ids (`buy-drugs`) or classifier categories (`violence`).
    pub categories: Vec<String>,
}

impl ModerationVerdict {
    pub fn blocked(source: VerdictSource, categories: Vec<String>) -> Self {
        Self {
            blocked: true,
            source,
            categories,
        }
    }

    /// Write the verdict to the moderation log along with the original input.
    pub fn log(&self, input: &str) {
        info!(
            target: "chatguard::moderation",
            time = %Utc::now().to_rfc3339(),
            input = input,
            source = %self.source,
            categories = ?self.categories,
            blocked = self.blocked,
            "Message blocked"
        );
    }
}
