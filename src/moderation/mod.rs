// Message moderation: a local lexical filter followed by a remote classifier.
//
// The lexical filter is cheap and deterministic, so it runs first and
// catches the obvious evasions ("buuuy drugs", "se11 drugs"). Messages that
// pass it go to the remote moderation service through the
// ModerationProvider trait. The SafetyClassifier wrapper fails closed:
// if the provider can't answer, the message counts as blocked.

pub mod classifier;
pub mod lexical;
pub mod normalize;
pub mod openai;
pub mod rules;
pub mod traits;
pub mod verdict;
