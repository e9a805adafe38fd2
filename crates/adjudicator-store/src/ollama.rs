//! Ollama Embedding Backend
//!
//! Sentence embeddings from a local Ollama server via `POST /api/embed`.
//! The client is blocking; async callers invoke it from the blocking pool.
//!
//! # Examples
//!
//! ```no_run
//! use adjudicator_store::ollama::OllamaEmbeddingModel;
//! use adjudicator_store::embedding::EmbeddingModel;
//!
//! let model = OllamaEmbeddingModel::new("http://localhost:11434", "all-minilm", 384).unwrap();
//! model.probe().unwrap();
//! let vector = model.embed("Knee surgery is covered").unwrap();
//! assert_eq!(vector.len(), 384);
//! ```

use crate::embedding::{EmbeddingError, EmbeddingModel};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default Ollama API endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:11434";

/// Default embedding model
pub const DEFAULT_MODEL: &str = "all-minilm";

/// Default timeout for embedding requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default number of texts per request
pub const DEFAULT_BATCH_SIZE: usize = 32;

/// Embedding model served by Ollama
pub struct OllamaEmbeddingModel {
    endpoint: String,
    model: String,
    dimension: usize,
    batch_size: usize,
    client: reqwest::blocking::Client,
    max_retries: u32,
    retry_base_delay: Duration,
}

/// Request body for the Ollama embed API
#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

/// Response from the Ollama embed API
#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

fn build_client(timeout: Duration) -> Result<reqwest::blocking::Client, EmbeddingError> {
    reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EmbeddingError::Backend(format!("Failed to build HTTP client: {}", e)))
}

impl OllamaEmbeddingModel {
    /// Create a new Ollama embedding model
    ///
    /// # Parameters
    ///
    /// - `endpoint`: Ollama API endpoint (e.g., "http://localhost:11434")
    /// - `model`: Embedding model name (e.g., "all-minilm")
    /// - `dimension`: Expected vector dimension, checked on every response
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        dimension: usize,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            dimension,
            batch_size: DEFAULT_BATCH_SIZE,
            client: build_client(Duration::from_secs(DEFAULT_TIMEOUT_SECS))?,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_secs(1),
        })
    }

    /// Replace the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, EmbeddingError> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    /// Set the number of texts sent per request (at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
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

    /// Check that the backend is reachable and produces vectors of the
    /// configured dimension
    pub fn probe(&self) -> Result<(), EmbeddingError> {
        let vector = self.embed("dimension probe")?;
        info!(
            endpoint = %self.endpoint,
            model = %self.model,
            dimension = vector.len(),
            "Embedding backend ready"
        );
        Ok(())
    }

    fn send_once(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/api/embed", self.endpoint);
        let body = EmbedRequest {
            model: &self.model,
            input: texts,
        };

        let response = self.client.post(&url).json(&body).send().map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else {
                EmbeddingError::Backend(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return if status.is_server_error() {
                Err(EmbeddingError::Backend(format!("HTTP {}: {}", status, message)))
            } else {
                Err(EmbeddingError::InvalidResponse(format!(
                    "HTTP {}: {}",
                    status, message
                )))
            };
        }

        let parsed: EmbedResponse = response
            .json()
            .map_err(|e| EmbeddingError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        if let Some(bad) = parsed.embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: bad.len(),
            });
        }

        Ok(parsed.embeddings)
    }

    fn send_with_retry(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.send_once(texts) {
                Ok(vectors) => return Ok(vectors),
                Err(e) if e.is_retryable() && attempts < self.max_retries => {
                    let delay = self.retry_base_delay * 2u32.pow(attempts - 1);
                    warn!(
                        attempt = attempts,
                        error = %e,
                        "Embedding request failed, retrying in {:?}",
                        delay
                    );
                    std::thread::sleep(delay);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl EmbeddingModel for OllamaEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| EmbeddingError::InvalidResponse("No embedding returned".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            debug!(model = %self.model, batch = batch.len(), "Requesting embeddings");
            vectors.extend(self.send_with_retry(batch)?);
        }
        Ok(vectors)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_creation() {
        let model = OllamaEmbeddingModel::new("http://localhost:11434/", "all-minilm", 384)
            .unwrap()
            .with_batch_size(0);
        assert_eq!(model.endpoint, "http://localhost:11434");
        assert_eq!(model.model_name(), "all-minilm");
        assert_eq!(model.dimension(), 384);
        assert_eq!(model.batch_size, 1);
    }

    #[test]
    fn test_empty_input_rejected_before_request() {
        let model = OllamaEmbeddingModel::new("http://127.0.0.1:9", "all-minilm", 384).unwrap();
        let result = model.embed_batch(&["ok", " "]);
        assert!(matches!(result, Err(EmbeddingError::InvalidInput(_))));
    }

    #[test]
    fn test_unreachable_backend() {
        let model = OllamaEmbeddingModel::new("http://127.0.0.1:9", "all-minilm", 384)
            .unwrap()
            .with_max_retries(1);
        let result = model.probe();
        assert!(matches!(result, Err(EmbeddingError::Backend(_))));
    }

    // Integration test (requires Ollama running with all-minilm pulled)
    #[test]
    #[ignore]
    fn test_embed_integration() {
        let model = OllamaEmbeddingModel::new(DEFAULT_ENDPOINT, DEFAULT_MODEL, 384).unwrap();
        model.probe().unwrap();
        let vector = model.embed("hello").unwrap();
        assert_eq!(vector.len(), 384);
    }
}
