//! Chat Completions Provider Implementation
//!
//! Integration with OpenAI-compatible `/chat/completions` APIs. The default
//! endpoint and model point at Groq, which hosts Llama 3.
//!
//! # Features
//!
//! - Bearer token authentication
//! - Per-request sampling options (temperature)
//! - Retry logic with exponential backoff for transient failures
//! - Timeout handling
//!
//! # Examples
//!
//! ```no_run
//! use adjudicator_llm::ChatCompletionsProvider;
//! use adjudicator_llm::chat::{DEFAULT_ENDPOINT, DEFAULT_MODEL};
//!
//! let api_key = std::env::var("GROQ_API_KEY").unwrap();
//! let provider = ChatCompletionsProvider::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, api_key).unwrap();
//! ```

use crate::LlmError;
use adjudicator_domain::traits::{GenerationOptions, LlmProvider};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API endpoint (Groq's OpenAI-compatible API)
pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1";

/// Default model
pub const DEFAULT_MODEL: &str = "llama3-70b-8192";

/// Default timeout for LLM requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Delay before the first retry; doubles on every further retry
pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Longest a retrying call can take before it gives up
///
/// Every attempt may run for the full `timeout`, and the backoff between
/// attempt `n` and `n + 1` is `base_delay * 2^(n - 1)`.
///
/// ```
/// use adjudicator_llm::chat::retry_budget;
/// use std::time::Duration;
///
/// // 30s x 3 attempts plus 1s and 2s of backoff
/// let budget = retry_budget(Duration::from_secs(30), 3, Duration::from_secs(1));
/// assert_eq!(budget, Duration::from_secs(93));
/// ```
pub fn retry_budget(timeout: Duration, max_attempts: u32, base_delay: Duration) -> Duration {
    let attempts = max_attempts.max(1);
    let backoff = (0..attempts - 1).fold(Duration::ZERO, |total, retry| {
        total.saturating_add(base_delay.saturating_mul(2u32.saturating_pow(retry)))
    });
    timeout.saturating_mul(attempts).saturating_add(backoff)
}

/// Provider for OpenAI-compatible chat completion APIs
pub struct ChatCompletionsProvider {
    endpoint: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    timeout: Duration,
    max_retries: u32,
    retry_base_delay: Duration,
}

/// Request body for the chat completions API
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Response from the chat completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn build_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Other(format!("Failed to build HTTP client: {}", e)))
}

impl ChatCompletionsProvider {
    /// Create a new provider
    ///
    /// # Parameters
    ///
    /// - `endpoint`: API base URL (e.g., "https://api.groq.com/openai/v1")
    /// - `model`: Model to use (e.g., "llama3-70b-8192")
    /// - `api_key`: Bearer token
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, LlmError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: DEFAULT_RETRY_BASE_DELAY,
        })
    }

    /// Replace the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, LlmError> {
        self.client = build_client(timeout)?;
        self.timeout = timeout;
        Ok(self)
    }

    /// Set the maximum number of attempts per request (at least one)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Set the delay before the first retry
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Longest a single `generate` call can take, retries included
    ///
    /// A caller that bounds `generate` with its own deadline must allow at
    /// least this much, or the later attempts are never made.
    pub fn retry_budget(&self) -> Duration {
        retry_budget(self.timeout, self.max_retries, self.retry_base_delay)
    }

    /// Send one request without retrying
    async fn send_once(&self, body: &ChatRequest<'_>) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout
                } else {
                    LlmError::Communication(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status.is_success() {
            let parsed = response
                .json::<ChatResponse>()
                .await
                .map_err(|e| LlmError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

            return parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| LlmError::InvalidResponse("Response contained no message".to_string()));
        }

        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::Authentication(message),
            StatusCode::NOT_FOUND => LlmError::ModelNotAvailable(self.model.clone()),
            StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimitExceeded,
            s if s.is_server_error() => LlmError::Server {
                status: s.as_u16(),
                message,
            },
            s => LlmError::InvalidRequest {
                status: s.as_u16(),
                message,
            },
        })
    }
}

#[async_trait]
impl LlmProvider for ChatCompletionsProvider {
    type Error = LlmError;

    /// Generate a completion, retrying transient failures
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The provider is unreachable after all attempts
    /// - The API key is rejected
    /// - The model is not available
    /// - The response body is not a chat completion
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, Self::Error> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: options.temperature,
        };

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "Sending chat completion");

        // Retry logic with exponential backoff
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.send_once(&body).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempts < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.pow(attempts - 1);
                    warn!(
                        attempt = attempts,
                        max_attempts = self.max_retries,
                        error = %e,
                        "Chat completion failed, retrying in {:?}",
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
