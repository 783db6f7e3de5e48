// The relay pipeline itself.
//
// Stages run strictly in order and the first failure wins:
// 1. validate the message (non-blank, within the length limit)
// 2. per-client rate limit
// 3. lexical filter (logged as a `rule` verdict)
// 4. remote classifier (logged as an `external` verdict, fails closed)
// 5. start generation and forward fragments as they arrive
//
// Validation runs before the rate limiter so malformed requests never
// consume a client's quota, and nothing remote is called for them.

use std::sync::Arc;

use anyhow::Result;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, error, info, warn};

use super::rejection::Rejection;
use crate::config::Config;
use crate::generation::openai::OpenAiChat;
use crate::generation::traits::{ChatGenerator, ChunkStream};
use crate::moderation::classifier::SafetyClassifier;
use crate::moderation::lexical::LexicalFilter;
use crate::moderation::openai::OpenAiModeration;
use crate::moderation::rules::{ForbiddenPairRule, RuleSet};
use crate::moderation::verdict::{ModerationVerdict, VerdictSource};
use crate::output::truncate_chars;
use crate::ratelimit::limiter::ClientRateLimiter;
use crate::ratelimit::store::MemoryWindowStore;

/// Reply fragments forwarded to the caller. Ends early, without an error,
/// if the model fails mid-reply.
pub type ReplyStream = BoxStream<'static, String>;

/// What happened to one message.
pub enum Outcome {
    Rejected(Rejection),
    Stream(ReplyStream),
}

impl Outcome {
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            Outcome::Rejected(rejection) => Some(*rejection),
            Outcome::Stream(_) => None,
        }
    }
}

/// Fixed per-process relay settings.
#[derive(Debug, Clone)]
pub struct RelaySettings {
    pub system_prompt: String,
    pub max_message_chars: usize,
}

impl RelaySettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            system_prompt: config.system_prompt.clone(),
            max_message_chars: config.max_message_chars,
        }
    }
}

/// Moderation and relay pipeline, shared by all requests.
pub struct RelayPipeline {
    limiter: ClientRateLimiter,
    filter: LexicalFilter,
    classifier: SafetyClassifier,
    generator: Arc<dyn ChatGenerator>,
    settings: RelaySettings,
}

impl RelayPipeline {
    pub fn new(
        limiter: ClientRateLimiter,
        filter: LexicalFilter,
        classifier: SafetyClassifier,
        generator: Arc<dyn ChatGenerator>,
        settings: RelaySettings,
    ) -> Self {
        Self {
            limiter,
            filter,
            classifier,
            generator,
            settings,
        }
    }

    /// Wire the pipeline to the OpenAI APIs and an in-memory rate-limit store.
    pub fn from_config(config: &Config) -> Result<Self> {
        let rules = RuleSet::load(config.rules_path.as_deref())?;
        let client = reqwest::Client::new();

        info!(
            rules = rules.len(),
            rate_limit = config.rate_limit,
            window_secs = config.rate_window.as_secs(),
            chat_model = %config.chat_model,
            moderation_model = %config.moderation_model,
            "Relay pipeline configured"
        );

        Ok(Self::new(
            ClientRateLimiter::new(
                Arc::new(MemoryWindowStore::new()),
                config.rate_limit,
                config.rate_window,
            ),
            LexicalFilter::new(rules),
            SafetyClassifier::new(Arc::new(OpenAiModeration::from_config(
                client.clone(),
                config,
            ))),
            Arc::new(OpenAiChat::from_config(client, config)),
            RelaySettings::from_config(config),
        ))
    }

    pub fn limiter(&self) -> &ClientRateLimiter {
        &self.limiter
    }

    /// Run one message through every stage.
    pub async fn handle(&self, identity: &str, message: &str) -> Outcome {
        if let Err(rejection) = self.moderate(identity, message).await {
            return Outcome::Rejected(rejection);
        }

        debug!(
            identity = identity,
            preview = %truncate_chars(message, 50),
            "Message cleared moderation, starting generation"
        );

        match self
            .generator
            .start(&self.settings.system_prompt, message)
            .await
        {
            Ok(chunks) => Outcome::Stream(forward(chunks)),
            Err(e) => {
                error!(error = %e, "Failed to start generation");
                Outcome::Rejected(Rejection::AssistantUnavailable)
            }
        }
    }

    /// Stages 1-4. `Ok` means the message may be sent to the model.
    async fn moderate(&self, identity: &str, message: &str) -> Result<(), Rejection> {
        self.validate(message)?;

        if !self.limiter.check(identity) {
            return Err(Rejection::RateLimited);
        }

        let violations = self.filter.scan(message);
        if !violations.is_empty() {
            ModerationVerdict::blocked(
                VerdictSource::Rule,
                violations.iter().map(ForbiddenPairRule::id).collect(),
            )
            .log(message);
            return Err(Rejection::ProhibitedContent);
        }

        let classification = self.classifier.classify(message).await;
        if classification.blocked {
            ModerationVerdict::blocked(VerdictSource::External, classification.category_names())
                .log(message);
            return Err(if classification.is_unavailable() {
                Rejection::SafetyUnavailable
            } else {
                Rejection::UnsafeContent
            });
        }

        Ok(())
    }

    fn validate(&self, message: &str) -> Result<(), Rejection> {
        if message.trim().is_empty() {
            return Err(Rejection::InvalidPayload);
        }
        if message.chars().count() > self.settings.max_message_chars {
            return Err(Rejection::InvalidPayload);
        }
        Ok(())
    }
}

/// Pass fragments through in arrival order, ending quietly on the first
/// upstream error. Whatever was already forwarded stays forwarded.
fn forward(chunks: ChunkStream) -> ReplyStream {
    stream::unfold(chunks, |mut chunks| async move {
        match chunks.next().await {
            Some(Ok(text)) => Some((text, chunks)),
            Some(Err(e)) => {
                warn!(error = %e, "Generation failed mid-stream, ending reply");
                None
            }
            None => None,
        }
    })
    .boxed()
}
