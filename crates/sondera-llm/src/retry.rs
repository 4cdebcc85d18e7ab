use std::time::Duration;

use futures::future::BoxFuture;
use tracing::warn;

use sondera_core::config::{ModelConfig, RetryConfig};
use sondera_core::error::{Result, SonderaError};
use sondera_core::traits::{GroundedSearch, TextGenerator};
use sondera_core::types::{ChatMessage, GroundedResponse};

/// A backend wrapper that retries transient upstream failures with
/// bounded exponential backoff. Schema violations and empty-input
/// errors pass through untouched.
pub struct RetryingClient<C> {
    inner: C,
    retry_config: RetryConfig,
}

impl<C> RetryingClient<C> {
    pub fn new(inner: C, retry_config: RetryConfig) -> Self {
        Self {
            inner,
            retry_config,
        }
    }
}

fn is_retryable(e: &SonderaError) -> bool {
    match e {
        SonderaError::Upstream(msg) => {
            msg.contains("429")
                || msg.contains("500")
                || msg.contains("502")
                || msg.contains("503")
                || msg.contains("timeout")
                || msg.contains("connection")
        }
        _ => false,
    }
}

fn calculate_backoff(attempt: u32, config: &RetryConfig) -> Duration {
    let ms = (config.initial_backoff_ms * 2u64.pow(attempt)).min(config.max_backoff_ms);
    // Add jitter: 0.8x to 1.2x
    let jitter = 0.8 + rand::random::<f64>() * 0.4;
    Duration::from_millis((ms as f64 * jitter) as u64)
}

macro_rules! with_retries {
    ($self:expr, $what:literal, $call:expr) => {{
        let max_retries = $self.retry_config.max_retries;
        let mut last_err = None;
        for attempt in 0..=max_retries {
            match $call.await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if is_retryable(&e) && attempt < max_retries {
                        let backoff = calculate_backoff(attempt, &$self.retry_config);
                        warn!(
                            attempt = attempt + 1,
                            max_retries,
                            backoff_ms = backoff.as_millis() as u64,
                            error = %e,
                            concat!("Retrying ", $what, " request")
                        );
                        tokio::time::sleep(backoff).await;
                        last_err = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| SonderaError::Upstream(concat!($what, ": all attempts failed").into())))
    }};
}

impl<C: TextGenerator> TextGenerator for RetryingClient<C> {
    fn generate(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<String>> {
        let config = config.clone();

        Box::pin(async move {
            with_retries!(self, "generate", self.inner.generate(&config, messages.clone()))
        })
    }

    fn generate_structured(
        &self,
        config: &ModelConfig,
        messages: Vec<ChatMessage>,
        schema: serde_json::Value,
    ) -> BoxFuture<'_, Result<serde_json::Value>> {
        let config = config.clone();

        Box::pin(async move {
            with_retries!(
                self,
                "structured generate",
                self.inner
                    .generate_structured(&config, messages.clone(), schema.clone())
            )
        })
    }
}

impl<C: GroundedSearch> GroundedSearch for RetryingClient<C> {
    fn search(
        &self,
        config: &ModelConfig,
        prompt: String,
    ) -> BoxFuture<'_, Result<GroundedResponse>> {
        let config = config.clone();

        Box::pin(async move {
            with_retries!(self, "grounded search", self.inner.search(&config, prompt.clone()))
        })
    }
}
