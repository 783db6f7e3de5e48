// OpenAI chat completions implementation with streaming.
//
// POST {base}/chat/completions with `stream: true` answers with server-sent
// events, one JSON chunk per `data:` line, terminated by `data: [DONE]`.
// Each chunk's `choices[0].delta.content` is one reply fragment; chunks
// without content (role announcements, finish markers) are skipped.
//
// A failed request or a non-success status means generation never started
// and is returned as an error from `start`. Anything that goes wrong after
// that (dropped connection, error event, unparseable chunk) is yielded as a
// final `Err` item and the stream ends.
//
// API docs: https://platform.openai.com/docs/api-reference/chat/streaming

use std::collections::VecDeque;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::sse::SseDecoder;
use super::traits::{ChatGenerator, ChunkStream};
use crate::config::Config;

/// OpenAI chat completions client.
pub struct OpenAiChat {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiChat {
    pub fn new(client: Client, base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_config(client: Client, config: &Config) -> Self {
        Self::new(
            client,
            &config.api_base_url,
            &config.openai_api_key,
            &config.chat_model,
        )
    }
}

#[async_trait]
impl ChatGenerator for OpenAiChat {
    async fn start(&self, system_prompt: &str, message: &str) -> Result<ChunkStream> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            stream: true,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: message,
                },
            ],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call chat completions API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completions API returned {}: {}", status, body);
        }

        debug!(model = %self.model, "Chat completion stream opened");

        Ok(fragments(response.bytes_stream().boxed()))
    }
}

/// Reader state threaded through `stream::unfold`.
struct StreamState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<String>>,
    done: bool,
}

/// Turn a raw SSE byte stream into reply fragments.
fn fragments<S, B, E>(bytes: S) -> ChunkStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let state = StreamState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for payload in state.decoder.feed(chunk.as_ref()) {
                        if state.accept(&payload) {
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    state.done = true;
                    state
                        .pending
                        .push_back(Err(anyhow::Error::new(e).context("Chat stream interrupted")));
                }
                None => {
                    if let Some(payload) = state.decoder.finish() {
                        state.accept(&payload);
                    }
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

impl<S> StreamState<S> {
    /// Queue the result of one `data:` payload. Returns true when the
    /// stream is finished and later payloads must be ignored.
    fn accept(&mut self, payload: &str) -> bool {
        match parse_payload(payload) {
            Ok(Payload::Done) => self.done = true,
            Ok(Payload::Content(text)) => self.pending.push_back(Ok(text)),
            Ok(Payload::Empty) => {}
            Err(e) => {
                self.pending.push_back(Err(e));
                self.done = true;
            }
        }
        self.done
    }
}

#[derive(Debug, PartialEq)]
enum Payload {
    Content(String),
    Empty,
    Done,
}

fn parse_payload(payload: &str) -> Result<Payload> {
    let payload = payload.trim();
    if payload == "[DONE]" {
        return Ok(Payload::Done);
    }

    let chunk: ChatChunk =
        serde_json::from_str(payload).context("Failed to parse chat stream chunk")?;

    if let Some(error) = chunk.error {
        anyhow::bail!("Chat stream error: {}", error.message);
    }

    let content = chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|text| !text.is_empty());

    Ok(match content {
        Some(text) => Payload::Content(text),
        None => Payload::Empty,
    })
}

// --- Chat completions request/response types ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    stream: bool,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiError {
    message: String,
}
