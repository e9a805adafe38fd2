//! Adjudicator Domain Layer
//!
//! This crate contains the data model shared by every stage of the
//! document-to-decision pipeline. It defines the value types and the trait
//! seams that the infrastructure crates implement.
//!
//! ## Key Concepts
//!
//! - **TextChunk**: A bounded slice of a source document, the unit of retrieval
//! - **ParsedQuery**: Structured fields an LLM extracted from a free-text query
//! - **RetrievedClause**: A chunk selected by nearest-neighbor search, with its rank
//! - **Decision**: An approve/reject outcome with a justification
//! - **DecisionRecord**: One persisted row of the append-only decision log
//!
//! ## Architecture
//!
//! - Pure data and trait definitions, no I/O
//! - Infrastructure implementations live in other crates
//! - Parse failures of LLM output are modelled as values, never as errors

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod chunk;
pub mod decision;
pub mod document;
pub mod query;
pub mod record;
pub mod retrieval;
pub mod traits;

// Re-exports for convenience
pub use chunk::TextChunk;
pub use decision::{Decision, DecisionOutcome, Verdict};
pub use document::DocumentId;
pub use query::{Gender, ParsedQuery, QueryOutcome, QUERY_PARSE_ERROR};
pub use record::{unix_timestamp, DecisionRecord, NewDecisionRecord};
pub use retrieval::RetrievedClause;
