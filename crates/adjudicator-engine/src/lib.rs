//! Adjudicator Engine
//!
//! The document-to-decision pipeline: query parsing, retrieval and the
//! decision step, wired together by [`Pipeline`].
//!
//! # Architecture
//!
//! ```text
//! upload → DocumentExtractor → VectorIndex::build → IndexRegistry
//!
//! query ─┬→ QueryParser (LLM) ──────────┐
//!        └→ Retriever (embed + search) ─┴→ DecisionEngine (LLM) → QueryReport
//! ```
//!
//! # Example Usage
//!
//! ```no_run
//! use adjudicator_engine::{EngineConfig, Pipeline, QueryRequest};
//! use adjudicator_extractor::DocumentExtractor;
//! use adjudicator_llm::MockProvider;
//! use adjudicator_store::{HashEmbeddingModel, IndexRegistry};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = Pipeline::new(
//!     Arc::new(MockProvider::default()),
//!     Arc::new(HashEmbeddingModel::default()),
//!     DocumentExtractor::default(),
//!     Arc::new(IndexRegistry::default()),
//!     EngineConfig::default(),
//! );
//!
//! let bytes = std::fs::read("policy.pdf")?;
//! let ingest = pipeline.ingest("policy.pdf", bytes).await?;
//!
//! let report = pipeline
//!     .query(QueryRequest::new("46M, knee surgery in Pune, 3-month policy").for_document(ingest.document_id))
//!     .await?;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod decision;
pub mod error;
pub mod json;
pub mod pipeline;
pub mod prompt;
pub mod query_parser;
pub mod retriever;

pub use decision::DecisionEngine;
pub use error::EngineError;
pub use pipeline::{EngineConfig, IngestReport, Pipeline, QueryReport, QueryRequest};
pub use query_parser::QueryParser;
pub use retriever::Retriever;

use adjudicator_domain::traits::{GenerationOptions, LlmProvider};
use std::time::Duration;
use tokio::time::timeout;

/// Call the LLM, failing with `Timeout` if it does not answer in time
pub(crate) async fn generate_with_timeout<L>(
    llm: &L,
    prompt: &str,
    options: &GenerationOptions,
    limit: Duration,
    stage: &str,
) -> Result<String, EngineError>
where
    L: LlmProvider + ?Sized,
{
    timeout(limit, llm.generate(prompt, options))
        .await
        .map_err(|_| EngineError::Timeout(stage.to_string()))?
        .map_err(|e| EngineError::ExternalService(e.to_string()))
}
