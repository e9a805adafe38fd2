//! Adjudicator LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `adjudicator-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `ChatCompletionsProvider`: OpenAI-compatible chat completions API
//!   (Groq by default)
//!
//! # Examples
//!
//! ```
//! use adjudicator_llm::MockProvider;
//! use adjudicator_domain::traits::{GenerationOptions, LlmProvider};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let provider = MockProvider::new("Hello from LLM!");
//! let result = provider.generate("test prompt", &GenerationOptions::default()).await.unwrap();
//! assert_eq!(result, "Hello from LLM!");
//! # }
//! ```

#![warn(missing_docs)]

pub mod chat;

use adjudicator_domain::traits::{GenerationOptions, LlmProvider};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use thiserror::Error;

pub use chat::ChatCompletionsProvider;

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// The request did not complete within the client timeout
    #[error("LLM request timed out")]
    Timeout,

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The provider answered with a server error
    #[error("Provider error (HTTP {status}): {message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// The API key was rejected
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Model not available
    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    /// The provider refused the request
    #[error("Request rejected (HTTP {status}): {message}")]
    InvalidRequest {
        /// HTTP status code
        status: u16,
        /// Response body
        message: String,
    },

    /// Invalid response from LLM
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::Communication(_)
                | LlmError::Timeout
                | LlmError::RateLimitExceeded
                | LlmError::Server { .. }
        )
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error,
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured responses without making any network calls.
/// Responses are keyed by a fragment of the prompt: the first registered
/// fragment contained in the prompt wins, otherwise the default response is
/// returned. Every prompt is recorded so tests can inspect what was sent.
///
/// # Examples
///
/// ```
/// use adjudicator_llm::MockProvider;
///
/// let mut provider = MockProvider::default();
/// provider.add_response("query parser", r#"{"age": 46}"#);
/// provider.add_response("Relevant Clauses", r#"{"decision": "Approved"}"#);
/// assert_eq!(provider.call_count(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_response: String,
    responses: Arc<Mutex<Vec<(String, MockReply)>>>,
    calls: Arc<Mutex<Vec<(String, GenerationOptions)>>>,
}

impl MockProvider {
    /// Create a new MockProvider with a fixed response for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_response: response.into(),
            responses: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Respond with `response` to any prompt containing `fragment`
    pub fn add_response(&mut self, fragment: impl Into<String>, response: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push((fragment.into(), MockReply::Text(response.into())));
    }

    /// Fail any prompt containing `fragment`
    pub fn add_error(&mut self, fragment: impl Into<String>) {
        self.responses
            .lock()
            .unwrap()
            .push((fragment.into(), MockReply::Error));
    }

    /// Get the number of times generate was called
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Reset the recorded calls
    pub fn reset_call_count(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// All prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(prompt, _)| prompt.clone())
            .collect()
    }

    /// Options passed with the most recent call
    pub fn last_options(&self) -> Option<GenerationOptions> {
        self.calls.lock().unwrap().last().map(|(_, options)| *options)
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    type Error = LlmError;

    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, Self::Error> {
        self.calls
            .lock()
            .unwrap()
            .push((prompt.to_string(), *options));

        let responses = self.responses.lock().unwrap();
        let reply = responses
            .iter()
            .find(|(fragment, _)| prompt.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(MockReply::Text(text)) => Ok(text),
            Some(MockReply::Error) => Err(LlmError::Communication("Mock error".to_string())),
            None => Ok(self.default_response.clone()),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
