// Relay pipeline: validate -> rate limit -> lexical filter -> classifier -> stream.
//
// Each stage can end the request with a Rejection. Only a message that
// clears every stage reaches the chat model, and its reply is handed back
// as a live stream of fragments.

pub mod pipeline;
pub mod rejection;

pub use pipeline::{Outcome, RelayPipeline, RelaySettings, ReplyStream};
pub use rejection::Rejection;
