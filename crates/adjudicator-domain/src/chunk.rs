//! Text chunks, the unit of retrieval

use serde::{Deserialize, Serialize};

/// A contiguous slice of a source document
///
/// Chunks are identified by their position in the ordered sequence produced
/// from one document. They are immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    index: usize,
    text: String,
}

impl TextChunk {
    /// Create a chunk at the given position
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }

    /// Position of this chunk within its document
    pub fn index(&self) -> usize {
        self.index
    }

    /// The chunk text
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length in characters (not bytes)
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}
