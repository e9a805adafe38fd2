//! Retriever: nearest chunks for a query

use crate::error::EngineError;
use adjudicator_domain::RetrievedClause;
use adjudicator_store::{EmbeddingModel, IndexedDocument};
use std::sync::Arc;
use tracing::debug;

/// Embeds queries and searches a document's index
///
/// The model must be the one that built the indexes searched; vectors from
/// different models are not comparable.
pub struct Retriever<M> {
    model: Arc<M>,
}

impl<M> Retriever<M>
where
    M: EmbeddingModel + 'static,
{
    /// Create a retriever using `model` for query vectors
    pub fn new(model: Arc<M>) -> Self {
        Self { model }
    }

    /// The `top_k` clauses of `document` nearest to `query`, best first
    ///
    /// Embedding and search run on the blocking pool.
    pub async fn search(
        &self,
        query: &str,
        document: Arc<IndexedDocument>,
        top_k: usize,
    ) -> Result<Vec<RetrievedClause>, EngineError> {
        if top_k == 0 {
            return Err(EngineError::InvalidTopK);
        }

        let model = Arc::clone(&self.model);
        let query = query.to_string();
        let document_id = document.id;

        let clauses = tokio::task::spawn_blocking(move || -> Result<_, EngineError> {
            let vector = model.embed(&query)?;
            Ok(document.index.search(&vector, top_k)?)
        })
        .await??;

        debug!(
            document_id = %document_id,
            top_k,
            returned = clauses.len(),
            best_distance = clauses.first().map(|c| c.distance),
            "Retrieved clauses"
        );
        Ok(clauses)
    }
}
