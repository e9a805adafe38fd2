//! Decision log records

use crate::{DecisionOutcome, DocumentId, QueryOutcome, RetrievedClause};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Seconds since the Unix epoch
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A completed query, before the log assigns it an id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDecisionRecord {
    /// When the query completed (Unix seconds)
    pub timestamp: u64,

    /// Document the query was answered against
    pub document_id: Option<DocumentId>,

    /// Free-text query as submitted
    pub query: String,

    /// Query parser outcome
    pub parsed: QueryOutcome,

    /// Clauses passed to the decision step
    pub retrieved_clauses: Vec<RetrievedClause>,

    /// Decision outcome, absent when the query could not be parsed
    pub decision: Option<DecisionOutcome>,
}

impl NewDecisionRecord {
    /// Attach the id assigned by the log
    pub fn with_id(self, id: i64) -> DecisionRecord {
        DecisionRecord {
            id,
            timestamp: self.timestamp,
            document_id: self.document_id,
            query: self.query,
            parsed: self.parsed,
            retrieved_clauses: self.retrieved_clauses,
            decision: self.decision,
        }
    }
}

/// One row of the append-only decision log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Autoincrement id
    pub id: i64,

    /// When the query completed (Unix seconds)
    pub timestamp: u64,

    /// Document the query was answered against
    pub document_id: Option<DocumentId>,

    /// Free-text query as submitted
    pub query: String,

    /// Query parser outcome
    pub parsed: QueryOutcome,

    /// Clauses passed to the decision step
    pub retrieved_clauses: Vec<RetrievedClause>,

    /// Decision outcome, absent when the query could not be parsed
    pub decision: Option<DecisionOutcome>,
}
