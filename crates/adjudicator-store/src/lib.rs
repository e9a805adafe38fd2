//! Adjudicator Storage Layer
//!
//! Embedding, indexing and persistence for the document-to-decision
//! pipeline.
//!
//! # Architecture
//!
//! - [`embedding`]: text to vector models (feature hashing, Ollama)
//! - [`vector_index`]: flat exact-L2 index over one document's chunks
//! - [`registry`]: per-document indexes with LRU and idle-time eviction
//! - [`DecisionLog`]: append-only SQLite log of completed queries
//!
//! # Examples
//!
//! ```no_run
//! use adjudicator_store::DecisionLog;
//!
//! let log = DecisionLog::new("decisions.db").unwrap();
//! // Log is now ready for append operations
//! ```

#![warn(missing_docs)]

pub mod embedding;
pub mod ollama;
pub mod registry;
pub mod vector_index;

pub use embedding::{EmbeddingBackend, EmbeddingError, EmbeddingModel, HashEmbeddingModel};
pub use ollama::OllamaEmbeddingModel;
pub use registry::{IndexRegistry, IndexedDocument, RegistryStats};
pub use vector_index::{VectorIndex, VectorIndexError};

use adjudicator_domain::traits::DecisionStore;
use adjudicator_domain::{DecisionRecord, DocumentId, NewDecisionRecord};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// SQLite-backed append-only log of decision records
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Share a `DecisionLog` between
/// tasks behind a mutex.
pub struct DecisionLog {
    conn: Connection,
}

/// Raw column values of one row
struct RawRecord {
    id: i64,
    timestamp: i64,
    document_id: Option<String>,
    query: String,
    parsed_query: String,
    retrieved_clauses: String,
    decision: Option<String>,
}

impl DecisionLog {
    /// Open (or create) a decision log at the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let log = Self { conn };
        log.initialize_schema()?;
        Ok(log)
    }

    /// Open an in-memory decision log
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    fn initialize_schema(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
        Ok(RawRecord {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            document_id: row.get(2)?,
            query: row.get(3)?,
            parsed_query: row.get(4)?,
            retrieved_clauses: row.get(5)?,
            decision: row.get(6)?,
        })
    }

    fn decode(raw: RawRecord) -> Result<DecisionRecord, StoreError> {
        let document_id = raw
            .document_id
            .as_deref()
            .map(DocumentId::from_string)
            .transpose()
            .map_err(StoreError::InvalidData)?;

        let record = NewDecisionRecord {
            timestamp: raw.timestamp.max(0) as u64,
            document_id,
            query: raw.query,
            parsed: serde_json::from_str(&raw.parsed_query)?,
            retrieved_clauses: serde_json::from_str(&raw.retrieved_clauses)?,
            decision: raw
                .decision
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
        };
        Ok(record.with_id(raw.id))
    }
}

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, document_id, query, parsed_query, retrieved_clauses, decision
     FROM decision_records";

impl DecisionStore for DecisionLog {
    type Error = StoreError;

    fn append(&mut self, record: &NewDecisionRecord) -> Result<i64, Self::Error> {
        let parsed = serde_json::to_string(&record.parsed)?;
        let clauses = serde_json::to_string(&record.retrieved_clauses)?;
        let decision = record
            .decision
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let timestamp = i64::try_from(record.timestamp).map_err(|_| {
            StoreError::InvalidData(format!("Timestamp {} is out of range", record.timestamp))
        })?;

        self.conn.execute(
            "INSERT INTO decision_records (timestamp, document_id, query, parsed_query, retrieved_clauses, decision)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                timestamp,
                record.document_id.map(|id| id.to_string()),
                &record.query,
                parsed,
                clauses,
                decision,
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get(&self, id: i64) -> Result<Option<DecisionRecord>, Self::Error> {
        let raw = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                Self::read_row,
            )
            .optional()?;

        raw.map(Self::decode).transpose()
    }

    fn recent(&self, limit: usize) -> Result<Vec<DecisionRecord>, Self::Error> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY id DESC LIMIT ?1", SELECT_COLUMNS))?;
        let rows = stmt
            .query_map(params![limit as i64], Self::read_row)?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(Self::decode).collect()
    }

    fn count(&self) -> Result<usize, Self::Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM decision_records", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}
