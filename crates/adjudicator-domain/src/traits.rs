//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{DecisionRecord, NewDecisionRecord};
use async_trait::async_trait;

/// Sampling options for a single completion
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GenerationOptions {
    /// Sampling temperature; `None` leaves the provider default
    pub temperature: Option<f32>,
}

impl GenerationOptions {
    /// The most deterministic sampling the provider offers
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
        }
    }
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (adjudicator-llm)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Error type for LLM operations
    type Error: std::error::Error + Send + Sync + 'static;

    /// Generate a completion for a single user prompt
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, Self::Error>;

    /// Name of the model answering prompts
    fn model_name(&self) -> &str;
}

/// Trait for the append-only decision log
///
/// Implemented by the infrastructure layer (adjudicator-store)
pub trait DecisionStore {
    /// Error type for store operations
    type Error;

    /// Append a record and return its assigned id
    fn append(&mut self, record: &NewDecisionRecord) -> Result<i64, Self::Error>;

    /// Get a record by id
    fn get(&self, id: i64) -> Result<Option<DecisionRecord>, Self::Error>;

    /// Most recent records, newest first
    fn recent(&self, limit: usize) -> Result<Vec<DecisionRecord>, Self::Error>;

    /// Number of records in the log
    fn count(&self) -> Result<usize, Self::Error>;
}
