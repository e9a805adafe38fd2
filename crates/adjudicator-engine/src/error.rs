//! Error types for the Engine

use adjudicator_domain::DocumentId;
use adjudicator_extractor::ExtractorError;
use adjudicator_store::{EmbeddingError, StoreError, VectorIndexError};
use thiserror::Error;

/// Errors that abort an ingest or a query
///
/// A reply from the LLM that does not parse is never an error; it is kept
/// as an unparsed query or an unstructured decision.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The upload is not a PDF or DOCX file
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The upload could not be read
    #[error("Failed to extract document: {0}")]
    Extraction(String),

    /// The upload exceeds the size limit
    #[error("Document too large: {size} bytes (max: {max})")]
    DocumentTooLarge {
        /// Upload size in bytes
        size: usize,
        /// Configured limit in bytes
        max: usize,
    },

    /// The query is empty or malformed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A search asked for zero results
    #[error("top_k must be at least 1")]
    InvalidTopK,

    /// No index is held for the requested document
    #[error("Document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// A query arrived before any document was indexed
    #[error("No document has been indexed")]
    EmptyIndex,

    /// The LLM or embedding backend failed
    #[error("External service error: {0}")]
    ExternalService(String),

    /// The LLM or embedding backend did not answer in time
    #[error("{0} timed out")]
    Timeout(String),

    /// Decision persistence is not configured
    #[error("Decision log is disabled")]
    DecisionLogDisabled,

    /// The decision log failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Stable snake_case name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::UnsupportedFormat(_) => "unsupported_format",
            EngineError::Extraction(_) => "extraction_error",
            EngineError::DocumentTooLarge { .. } => "document_too_large",
            EngineError::InvalidQuery(_) => "invalid_query",
            EngineError::InvalidTopK => "invalid_top_k",
            EngineError::DocumentNotFound(_) => "document_not_found",
            EngineError::EmptyIndex => "empty_index",
            EngineError::ExternalService(_) => "external_service_error",
            EngineError::Timeout(_) => "timeout",
            EngineError::DecisionLogDisabled => "decision_log_disabled",
            EngineError::Storage(_) => "storage_error",
            EngineError::Internal(_) => "internal_error",
        }
    }
}

impl From<ExtractorError> for EngineError {
    fn from(e: ExtractorError) -> Self {
        match e {
            ExtractorError::UnsupportedFormat(name) => EngineError::UnsupportedFormat(name),
            ExtractorError::DocumentTooLarge { size, max } => {
                EngineError::DocumentTooLarge { size, max }
            }
            ExtractorError::Extraction(_) | ExtractorError::EmptyDocument => {
                EngineError::Extraction(e.to_string())
            }
            ExtractorError::Config(message) => EngineError::Internal(message),
        }
    }
}

impl From<EmbeddingError> for EngineError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::Timeout => EngineError::Timeout("Embedding request".to_string()),
            EmbeddingError::InvalidInput(message) => EngineError::InvalidQuery(message),
            EmbeddingError::Backend(_)
            | EmbeddingError::InvalidResponse(_)
            | EmbeddingError::DimensionMismatch { .. } => EngineError::ExternalService(e.to_string()),
        }
    }
}

impl From<VectorIndexError> for EngineError {
    fn from(e: VectorIndexError) -> Self {
        match e {
            VectorIndexError::EmptyIndex => EngineError::EmptyIndex,
            VectorIndexError::InvalidTopK => EngineError::InvalidTopK,
            VectorIndexError::Embedding(inner) => inner.into(),
            VectorIndexError::DimensionMismatch { .. } => EngineError::Internal(e.to_string()),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(e: StoreError) -> Self {
        EngineError::Storage(e.to_string())
    }
}

impl From<tokio::task::JoinError> for EngineError {
    fn from(e: tokio::task::JoinError) -> Self {
        EngineError::Internal(format!("Task join error: {}", e))
    }
}
