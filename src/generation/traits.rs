// Chat generator trait.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Live sequence of reply fragments, in arrival order.
/// An `Err` item means the upstream failed mid-stream.
pub type ChunkStream = BoxStream<'static, Result<String>>;

/// Remote chat model that streams its reply.
#[async_trait]
pub trait ChatGenerator: Send + Sync {
    /// Start generating a reply to a single user message under a fixed
    /// system directive. No conversation history is sent.
    ///
    /// Returns an error if generation can't start at all; once the stream
    /// is returned, failures arrive as `Err` items.
    async fn start(&self, system_prompt: &str, message: &str) -> Result<ChunkStream>;
}
