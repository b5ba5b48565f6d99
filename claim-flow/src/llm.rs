//! OpenRouter-backed structured completion client built on `rig`.

use async_trait::async_trait;
use rig::{client::CompletionClient, completion::Prompt, providers::openrouter};
use serde_json::Value;
use tracing::{debug, info};

use crate::{
    completion::{RetryPolicy, StructuredCompletion},
    error::CompletionError,
    schema::Schema,
};

pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

const PREAMBLE: &str = "You are a precise insurance claims assistant. \
You always answer with a single JSON object that follows the requested format instructions.";

/// Structured completion through an OpenRouter chat model at temperature 0
pub struct OpenRouterCompletion {
    client: openrouter::Client,
    model: String,
    retry: RetryPolicy,
}

impl OpenRouterCompletion {
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        Self {
            client: openrouter::Client::new(api_key),
            model: model.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Build a client from `OPENROUTER_API_KEY` using the default model
    pub fn from_env() -> Result<Self, CompletionError> {
        let api_key = std::env::var("OPENROUTER_API_KEY")
            .map_err(|_| CompletionError::new("OPENROUTER_API_KEY not set"))?;
        Ok(Self::new(&api_key, DEFAULT_MODEL))
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn attempt(&self, schema: &Schema, prompt: &str) -> Result<Value, CompletionError> {
        let agent = self
            .client
            .agent(&self.model)
            .preamble(PREAMBLE)
            .temperature(0.0)
            .build();

        let raw = agent
            .prompt(prompt)
            .await
            .map_err(|e| CompletionError::new(format!("LLM request failed: {}", e)))?;
        debug!(schema = schema.name, raw_len = raw.len(), "received completion");

        schema.parse_response(&raw)
    }
}

#[async_trait]
impl StructuredCompletion for OpenRouterCompletion {
    async fn complete(&self, schema: &Schema, prompt: &str) -> Result<Value, CompletionError> {
        info!(model = %self.model, schema = schema.name, "requesting structured completion");
        self.retry
            .run(|_| self.attempt(schema, prompt))
            .await
    }
}
