//! Flat Vector Index for Exact Nearest-Neighbor Search
//!
//! Holds one (chunk, embedding) pair per chunk of a document and answers
//! top-k queries by exact Euclidean distance. An index is built once from a
//! chunk sequence and never mutated afterwards; replacing a document means
//! building a new index.

use crate::embedding::{l2_distance, EmbeddingError, EmbeddingModel};
use adjudicator_domain::{RetrievedClause, TextChunk};
use std::cmp::Ordering;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during vector index operations
#[derive(Error, Debug)]
pub enum VectorIndexError {
    /// Invalid embedding dimension
    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension provided
        actual: usize,
    },

    /// Search against an index holding no vectors
    #[error("Index is empty")]
    EmptyIndex,

    /// A search asked for zero results
    #[error("top_k must be at least 1")]
    InvalidTopK,

    /// Embedding the chunks failed
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: TextChunk,
    vector: Vec<f32>,
}

/// An immutable exact-search index over one document's chunks
///
/// # Examples
///
/// ```
/// use adjudicator_domain::TextChunk;
/// use adjudicator_store::embedding::{EmbeddingModel, HashEmbeddingModel};
/// use adjudicator_store::vector_index::VectorIndex;
///
/// let model = HashEmbeddingModel::new(64);
/// let chunks = vec![
///     TextChunk::new(0, "Knee surgery is covered"),
///     TextChunk::new(1, "Dental care is excluded"),
/// ];
/// let index = VectorIndex::build(&model, chunks).unwrap();
///
/// let query = model.embed("Knee surgery is covered").unwrap();
/// let hits = index.search(&query, 1).unwrap();
/// assert_eq!(hits[0].chunk_index, 0);
/// ```
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

impl VectorIndex {
    /// Embed every chunk with `model` and load the vectors in chunk order
    pub fn build<M>(model: &M, chunks: Vec<TextChunk>) -> Result<Self, VectorIndexError>
    where
        M: EmbeddingModel + ?Sized,
    {
        let texts: Vec<&str> = chunks.iter().map(|c| c.text()).collect();
        let vectors = if texts.is_empty() {
            Vec::new()
        } else {
            model.embed_batch(&texts)?
        };

        if vectors.len() != chunks.len() {
            return Err(EmbeddingError::InvalidResponse(format!(
                "Expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            ))
            .into());
        }

        let index = Self::from_vectors(model.dimension(), chunks.into_iter().zip(vectors))?;
        debug!(
            vectors = index.len(),
            dimension = index.dimension,
            model = model.model_name(),
            "Built vector index"
        );
        Ok(index)
    }

    /// Load precomputed vectors
    ///
    /// Every vector must have exactly `dimension` components.
    pub fn from_vectors<I>(dimension: usize, pairs: I) -> Result<Self, VectorIndexError>
    where
        I: IntoIterator<Item = (TextChunk, Vec<f32>)>,
    {
        let entries = pairs
            .into_iter()
            .map(|(chunk, vector)| {
                if vector.len() != dimension {
                    return Err(VectorIndexError::DimensionMismatch {
                        expected: dimension,
                        actual: vector.len(),
                    });
                }
                Ok(IndexEntry { chunk, vector })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { dimension, entries })
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no vectors
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimension shared by every vector in the index
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Chunks in index order
    pub fn chunks(&self) -> impl Iterator<Item = &TextChunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// The `top_k` chunks nearest to `query`, best match first
    ///
    /// `top_k` is clamped to the index size. Equal distances keep index
    /// order.
    ///
    /// # Errors
    ///
    /// - `InvalidTopK` if `top_k` is zero
    /// - `EmptyIndex` if the index holds no vectors
    /// - `DimensionMismatch` if `query` has the wrong dimension
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedClause>, VectorIndexError> {
        if top_k == 0 {
            return Err(VectorIndexError::InvalidTopK);
        }
        if self.entries.is_empty() {
            return Err(VectorIndexError::EmptyIndex);
        }
        if query.len() != self.dimension {
            return Err(VectorIndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| (position, l2_distance(query, &entry.vector)))
            .collect();

        // sort_by is stable, so ties stay in index order
        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(top_k.min(self.entries.len()))
            .enumerate()
            .map(|(rank, (position, distance))| {
                let chunk = &self.entries[position].chunk;
                RetrievedClause {
                    rank,
                    chunk_index: chunk.index(),
                    text: chunk.text().to_string(),
                    distance,
                }
            })
            .collect())
    }
}
