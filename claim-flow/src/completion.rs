use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::{error::CompletionError, schema::Schema};

/// A completion service that answers a prompt with a value conforming to a schema.
///
/// Implementations must return only values that pass [`Schema::validate`]; every other outcome
/// is a [`CompletionError`].
#[async_trait]
pub trait StructuredCompletion: Send + Sync {
    async fn complete(&self, schema: &Schema, prompt: &str) -> Result<Value, CompletionError>;
}

/// Run a completion and deserialize the result into `T`
pub async fn complete_as<T: DeserializeOwned>(
    client: &dyn StructuredCompletion,
    schema: &Schema,
    prompt: &str,
) -> Result<T, CompletionError> {
    let value = client.complete(schema, prompt).await?;
    serde_json::from_value(value).map_err(|e| {
        CompletionError::new(format!("{} response has unexpected shape: {}", schema.name, e))
    })
}

/// Bounded retry with exponential backoff around a completion call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Call `op` until it succeeds or the attempts run out. `op` receives the 1-based attempt
    /// number. The last error is returned.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> Result<T, CompletionError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, CompletionError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut backoff = self.initial_backoff;
        let mut attempt = 1;
        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts => return Err(e),
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = attempts,
                        error = %e,
                        "completion attempt failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}
