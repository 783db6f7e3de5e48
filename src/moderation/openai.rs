// OpenAI moderation API implementation.
//
// Sends the raw message to POST {base}/moderations and reads the category
// flags of the first result. Any transport error, non-success status, or
// response without a result is returned as an error; the SafetyClassifier
// turns those into a fail-closed block.
//
// API docs: https://platform.openai.com/docs/api-reference/moderations

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::traits::{CategoryFlags, ModerationProvider};
use crate::config::Config;
use crate::output::truncate_chars;

/// OpenAI moderation endpoint client.
pub struct OpenAiModeration {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiModeration {
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
            &config.moderation_model,
        )
    }
}

#[async_trait]
impl ModerationProvider for OpenAiModeration {
    async fn moderate(&self, text: &str) -> Result<CategoryFlags> {
        let url = format!("{}/moderations", self.base_url);
        let request = ModerationRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call moderation API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Moderation API returned {}: {}", status, body);
        }

        let result: ModerationResponse = response
            .json()
            .await
            .context("Failed to parse moderation API response")?;

        let flags = result.into_flags()?;

        debug!(
            violence = flags.violence,
            sexual = flags.sexual,
            sexual_minors = flags.sexual_minors,
            text_preview = %truncate_chars(text, 50),
            "Moderated text"
        );

        Ok(flags)
    }
}

// --- Moderation API request/response types ---

#[derive(Serialize)]
struct ModerationRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct ModerationResponse {
    results: Vec<ModerationResult>,
}

#[derive(Deserialize)]
struct ModerationResult {
    categories: Categories,
}

#[derive(Deserialize)]
struct Categories {
    #[serde(default)]
    violence: bool,
    #[serde(default)]
    sexual: bool,
    #[serde(rename = "sexual/minors", default)]
    sexual_minors: bool,
}

impl ModerationResponse {
    fn into_flags(self) -> Result<CategoryFlags> {
        let first = self
            .results
            .into_iter()
            .next()
            .context("Moderation API returned no results")?;
        Ok(CategoryFlags {
            violence: first.categories.violence,
            sexual: first.categories.sexual,
            sexual_minors: first.categories.sexual_minors,
        })
    }
}
