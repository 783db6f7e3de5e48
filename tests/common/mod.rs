// In-process stand-ins for the remote moderation and chat services.
//
// Each fake counts its invocations so tests can assert that a stage was
// (or was not) reached.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

use chatguard::generation::traits::{ChatGenerator, ChunkStream};
use chatguard::moderation::classifier::SafetyClassifier;
use chatguard::moderation::lexical::LexicalFilter;
use chatguard::moderation::traits::{CategoryFlags, ModerationProvider};
use chatguard::ratelimit::limiter::ClientRateLimiter;
use chatguard::ratelimit::store::MemoryWindowStore;
use chatguard::relay::{RelayPipeline, RelaySettings};

pub const SYSTEM_PROMPT: &str = "You are a test friend.";

// ============================================================
// Moderation provider
// ============================================================

pub enum ModerationMode {
    Clean,
    Flag(CategoryFlags),
    Fail,
}

pub struct FakeModeration {
    mode: ModerationMode,
    pub calls: AtomicUsize,
}

impl FakeModeration {
    pub fn new(mode: ModerationMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModerationProvider for FakeModeration {
    async fn moderate(&self, _text: &str) -> Result<CategoryFlags> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            ModerationMode::Clean => Ok(CategoryFlags::default()),
            ModerationMode::Flag(flags) => Ok(flags),
            ModerationMode::Fail => anyhow::bail!("simulated transport error"),
        }
    }
}

// ============================================================
// Chat generator
// ============================================================

pub enum Step {
    Chunk(&'static str),
    Fail(&'static str),
}

pub struct FakeChat {
    script: Vec<Step>,
    fail_start: bool,
    pub calls: AtomicUsize,
    /// (system prompt, user message) of the last call.
    pub last_request: Mutex<Option<(String, String)>>,
}

impl FakeChat {
    pub fn replying(chunks: &[&'static str]) -> Arc<Self> {
        Self::scripted(chunks.iter().map(|&c| Step::Chunk(c)).collect())
    }

    pub fn scripted(script: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            script,
            fail_start: false,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn failing_to_start() -> Arc<Self> {
        Arc::new(Self {
            script: Vec::new(),
            fail_start: true,
            calls: AtomicUsize::new(0),
            last_request: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatGenerator for FakeChat {
    async fn start(&self, system_prompt: &str, message: &str) -> Result<ChunkStream> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some((system_prompt.to_string(), message.to_string()));

        if self.fail_start {
            anyhow::bail!("simulated 502 from upstream");
        }

        let items: Vec<Result<String>> = self
            .script
            .iter()
            .map(|step| match step {
                Step::Chunk(text) => Ok(text.to_string()),
                Step::Fail(reason) => Err(anyhow::anyhow!("{reason}")),
            })
            .collect();
        Ok(stream::iter(items).boxed())
    }
}

/// Generator that yields one chunk and then never finishes, flagging when
/// its stream is dropped.
pub struct EndlessChat {
    pub dropped: Arc<AtomicBool>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChatGenerator for EndlessChat {
    async fn start(&self, _system_prompt: &str, _message: &str) -> Result<ChunkStream> {
        let flag = DropFlag(self.dropped.clone());
        let stream = stream::unfold((flag, 0u32), |(flag, n)| async move {
            if n > 0 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Some((Ok(format!("chunk{n} ")), (flag, n + 1)))
        });
        Ok(stream.boxed())
    }
}

// ============================================================
// Pipeline wiring
// ============================================================

pub fn pipeline_with(
    provider: Arc<dyn ModerationProvider>,
    generator: Arc<dyn ChatGenerator>,
    limit: u32,
) -> RelayPipeline {
    RelayPipeline::new(
        ClientRateLimiter::new(
            Arc::new(MemoryWindowStore::new()),
            limit,
            Duration::from_secs(60),
        ),
        LexicalFilter::default(),
        SafetyClassifier::new(provider),
        generator,
        RelaySettings {
            system_prompt: SYSTEM_PROMPT.to_string(),
            max_message_chars: 2000,
        },
    )
}

// ============================================================
// Log capture
// ============================================================

/// One captured tracing event, with every field rendered as text.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub target: String,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Layer that records events so tests can assert on what was logged.
#[derive(Clone, Default)]
pub struct CaptureLayer {
    captured: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl CaptureLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged under exactly `target`.
    pub fn events_for(&self, target: &str) -> Vec<CapturedEvent> {
        self.captured
            .lock()
            .unwrap()
            .iter()
            .filter(|event| event.target == target)
            .cloned()
            .collect()
    }
}

impl<S> Layer<S> for CaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        self.captured.lock().unwrap().push(CapturedEvent {
            target: event.metadata().target().to_string(),
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    fields: HashMap<String, String>,
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{value:?}"));
    }
}
