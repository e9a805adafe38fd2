//! Retrieval results

use serde::{Deserialize, Serialize};

/// A chunk returned by nearest-neighbor search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedClause {
    /// Position in the result list, 0 is the best match
    pub rank: usize,

    /// Index of the chunk within its document
    pub chunk_index: usize,

    /// Chunk text
    pub text: String,

    /// L2 distance between the query vector and the chunk vector
    pub distance: f32,
}
