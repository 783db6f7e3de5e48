// Terminal decisions for a rejected message.
//
// The display text is what the caller sees in `{"ok": false, "error": ...}`.
// Nothing is retried inside the relay; `is_retryable` tells the caller
// whether trying the same message again later can succeed. Mapping to a
// transport status belongs to the front end (see `web::rejection_status`).

use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Empty, whitespace-only, over-long, or malformed payload.
    #[error("Invalid request payload")]
    InvalidPayload,

    #[error("Rate limit exceeded")]
    RateLimited,

    /// Lexical filter match.
    #[error("Message blocked due to prohibited content. Please rephrase.")]
    ProhibitedContent,

    /// The classifier couldn't be consulted, so the message was held back.
    #[error("Unable to check message safety right now.")]
    SafetyUnavailable,

    /// The classifier flagged the message.
    #[error("Message blocked due to unsafe content.")]
    UnsafeContent,

    /// Generation failed to start.
    #[error("Assistant temporarily unavailable")]
    AssistantUnavailable,
}

impl Rejection {
    /// Whether the same message may succeed if sent again later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Rejection::RateLimited
                | Rejection::SafetyUnavailable
                | Rejection::AssistantUnavailable
        )
    }
}
