//! Embedding Models for Text Vectorization
//!
//! This module turns chunk and query text into fixed-dimension vectors for
//! nearest-neighbor search. One model instance is built at process start and
//! shared by every index build and every query, so vectors in one index are
//! always comparable with the query vector searched against it.
//!
//! # Architecture
//!
//! - **HashEmbeddingModel**: Deterministic feature-hashing embeddings, no
//!   model files or network (offline use and tests)
//! - **OllamaEmbeddingModel**: Sentence embeddings from a local Ollama server
//!   (see [`crate::ollama`])
//! - **EmbeddingBackend**: Selects one of the above from configuration
//!
//! # Examples
//!
//! ```rust
//! use adjudicator_store::embedding::{EmbeddingModel, HashEmbeddingModel};
//!
//! let model = HashEmbeddingModel::new(384);
//! let text = "Knee surgery is covered";
//! let embedding = model.embed(text).unwrap();
//! assert_eq!(embedding.len(), 384);
//!
//! // Same text always produces same embedding
//! let embedding2 = model.embed(text).unwrap();
//! assert_eq!(embedding, embedding2);
//! ```

use crate::ollama::OllamaEmbeddingModel;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use thiserror::Error;

/// Default embedding dimension (all-MiniLM-L6-v2)
pub const DEFAULT_DIMENSION: usize = 384;

/// Errors that can occur during embedding generation
#[derive(Error, Debug)]
pub enum EmbeddingError {
    /// Invalid input text
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The embedding backend is unreachable or failed
    #[error("Embedding backend error: {0}")]
    Backend(String),

    /// The embedding backend did not answer in time
    #[error("Embedding request timed out")]
    Timeout,

    /// The backend answered with something other than embeddings
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    /// A vector does not have the configured dimension
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Configured dimension
        expected: usize,
        /// Dimension returned by the backend
        actual: usize,
    },
}

impl EmbeddingError {
    /// Whether repeating the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmbeddingError::Backend(_) | EmbeddingError::Timeout)
    }
}

/// Trait for embedding models
///
/// Implementations are synchronous and may block on I/O; async callers run
/// them on the blocking thread pool.
pub trait EmbeddingModel: Send + Sync {
    /// Generate an embedding vector for the given text
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate one embedding per input, in input order
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Get the dimension of embeddings produced by this model
    fn dimension(&self) -> usize;

    /// Name of the underlying model
    fn model_name(&self) -> &str;
}

/// Deterministic embedding model based on feature hashing
///
/// Every lowercase alphanumeric token of the input is hashed into a signed
/// bucket; the bucket counts are then normalized to unit length. The
/// embeddings are:
///
/// - **Deterministic**: Same text always produces same embedding
/// - **Normalized**: All vectors have unit length
/// - **Lexical**: Texts sharing words are closer than unrelated texts
#[derive(Debug, Clone)]
pub struct HashEmbeddingModel {
    dimension: usize,
}

impl HashEmbeddingModel {
    /// Create a new hash embedding model
    ///
    /// # Parameters
    ///
    /// - `dimension`: The embedding dimension (at least 1)
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Hash a token with a seed
    fn hash_with_seed(token: &str, seed: u64) -> u64 {
        let mut hasher = DefaultHasher::new();
        token.hash(&mut hasher);
        seed.hash(&mut hasher);
        hasher.finish()
    }

    fn accumulate(&self, embedding: &mut [f32], token: &str) {
        // Two buckets per token to soften collisions
        for seed in 0..2u64 {
            let hash = Self::hash_with_seed(token, seed);
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) == 0 { 1.0 } else { -1.0 };
            embedding[bucket] += sign;
        }
    }
}

impl Default for HashEmbeddingModel {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSION)
    }
}

impl EmbeddingModel for HashEmbeddingModel {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::InvalidInput(
                "Empty text cannot be embedded".to_string(),
            ));
        }

        let mut embedding = vec![0.0f32; self.dimension];
        let lowered = trimmed.to_lowercase();
        let mut tokens = 0usize;
        for token in lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            self.accumulate(&mut embedding, token);
            tokens += 1;
        }
        if tokens == 0 {
            self.accumulate(&mut embedding, &lowered);
        }

        // Normalize to unit length
        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut embedding {
                *value /= magnitude;
            }
        } else {
            // Every bucket cancelled out; fall back to a fixed direction
            embedding[0] = 1.0;
        }

        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "feature-hash"
    }
}

/// The embedding backend selected at startup
pub enum EmbeddingBackend {
    /// Offline feature-hashing model
    Hash(HashEmbeddingModel),
    /// Ollama embedding server
    Ollama(OllamaEmbeddingModel),
}

impl EmbeddingModel for EmbeddingBackend {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            EmbeddingBackend::Hash(model) => model.embed(text),
            EmbeddingBackend::Ollama(model) => model.embed(text),
        }
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match self {
            EmbeddingBackend::Hash(model) => model.embed_batch(texts),
            EmbeddingBackend::Ollama(model) => model.embed_batch(texts),
        }
    }

    fn dimension(&self) -> usize {
        match self {
            EmbeddingBackend::Hash(model) => model.dimension(),
            EmbeddingBackend::Ollama(model) => model.dimension(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            EmbeddingBackend::Hash(model) => model.model_name(),
            EmbeddingBackend::Ollama(model) => model.model_name(),
        }
    }
}

/// Euclidean (L2) distance between two vectors
///
/// # Panics
///
/// Panics if vectors have different lengths
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "Vectors must have same length");

    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f32>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_embedding_deterministic() {
        let model = HashEmbeddingModel::new(384);

        let text = "Pre-existing conditions are excluded for 36 months";
        let embedding1 = model.embed(text).unwrap();
        let embedding2 = model.embed(text).unwrap();

        assert_eq!(embedding1, embedding2, "Same text should produce same embedding");
    }

    #[test]
    fn test_hash_embedding_dimension() {
        let model = HashEmbeddingModel::new(128);

        let embedding = model.embed("test").unwrap();
        assert_eq!(embedding.len(), 128);
        assert_eq!(model.dimension(), 128);
    }

    #[test]
    fn test_hash_embedding_normalized() {
        let model = HashEmbeddingModel::new(384);

        let embedding = model.embed("test text").unwrap();

        let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 0.0001, "Embedding should be normalized");
    }

    #[test]
    fn test_hash_embedding_empty_text() {
        let model = HashEmbeddingModel::new(384);

        let result = model.embed("   ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Empty text"));
    }

    #[test]
    fn test_hash_embedding_punctuation_only() {
        let model = HashEmbeddingModel::new(64);
        let embedding = model.embed("...").unwrap();
        assert_eq!(embedding.len(), 64);
    }

    #[test]
    fn test_shared_words_are_closer() {
        let model = HashEmbeddingModel::new(384);

        let query = model.embed("Is knee surgery covered?").unwrap();
        let related = model
            .embed("Knee surgery is covered up to INR 150000")
            .unwrap();
        let unrelated = model
            .embed("Dental treatment requires a waiting period")
            .unwrap();

        assert!(l2_distance(&query, &related) < l2_distance(&query, &unrelated));
    }

    #[test]
    fn test_case_insensitive_tokens() {
        let model = HashEmbeddingModel::new(384);
        let a = model.embed("Knee Surgery").unwrap();
        let b = model.embed("knee surgery").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_embed_batch_preserves_order() {
        let model = HashEmbeddingModel::new(32);
        let batch = model.embed_batch(&["first", "second"]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], model.embed("first").unwrap());
        assert_eq!(batch[1], model.embed("second").unwrap());
    }

    #[test]
    fn test_backend_delegates() {
        let backend = EmbeddingBackend::Hash(HashEmbeddingModel::new(16));
        assert_eq!(backend.dimension(), 16);
        assert_eq!(backend.model_name(), "feature-hash");
        assert_eq!(backend.embed("abc").unwrap().len(), 16);
    }

    #[test]
    fn test_l2_distance() {
        assert_eq!(l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(l2_distance(&[1.0, 2.0], &[1.0, 2.0]), 0.0);
    }

    #[test]
    fn test_retryable_classification() {
        assert!(EmbeddingError::Timeout.is_retryable());
        assert!(EmbeddingError::Backend("refused".into()).is_retryable());
        assert!(!EmbeddingError::InvalidInput("".into()).is_retryable());
        assert!(!EmbeddingError::DimensionMismatch {
            expected: 384,
            actual: 768
        }
        .is_retryable());
    }
}
