// Chat generation: streaming replies from a hosted language model.
//
// The ChatGenerator trait hides the provider. Its stream is a boxed
// futures::Stream, so dropping it (for example when the HTTP client
// disconnects) drops the upstream response and stops reading immediately.

pub mod openai;
pub mod sse;
pub mod traits;
