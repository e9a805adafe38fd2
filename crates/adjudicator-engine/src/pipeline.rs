//! Pipeline service context
//!
//! [`Pipeline`] owns every long-lived resource of the service: the extractor,
//! the shared embedding model, the index registry, the two LLM stages and the
//! optional decision log. It is built once at startup and shared by all
//! requests.

use crate::decision::DecisionEngine;
use crate::error::EngineError;
use crate::query_parser::QueryParser;
use crate::retriever::Retriever;
use adjudicator_domain::traits::{DecisionStore, LlmProvider};
use adjudicator_domain::{
    unix_timestamp, DecisionOutcome, DecisionRecord, DocumentId, NewDecisionRecord, QueryOutcome,
    RetrievedClause,
};
use adjudicator_extractor::{DocumentExtractor, DocumentFormat};
use adjudicator_store::{DecisionLog, EmbeddingModel, IndexRegistry, IndexedDocument, VectorIndex};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{error, info, warn};

/// Default number of clauses retrieved per query
pub const DEFAULT_TOP_K: usize = 5;

/// Default limit for a single LLM call, retries included (seconds)
///
/// Covers the chat provider's defaults: three 30s attempts with 1s and 2s
/// of backoff.
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;

/// Tunables for query handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Limit for a single LLM call, retries included
    pub llm_timeout: Duration,
    /// Clauses retrieved when a request does not say
    pub default_top_k: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            llm_timeout: Duration::from_secs(DEFAULT_LLM_TIMEOUT_SECS),
            default_top_k: DEFAULT_TOP_K,
        }
    }
}

/// Result of indexing an upload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestReport {
    /// Id under which the index is held
    pub document_id: DocumentId,
    /// Uploaded filename
    pub filename: String,
    /// Detected format
    pub format: DocumentFormat,
    /// Number of chunks indexed
    pub chunk_count: usize,
}

/// A query against an indexed document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Free-text query
    #[serde(default)]
    pub query: String,
    /// Document to search; the most recent upload when absent
    #[serde(default)]
    pub document_id: Option<DocumentId>,
    /// Number of clauses to retrieve
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl QueryRequest {
    /// A query against the most recent upload with the default `top_k`
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Search a specific document
    pub fn for_document(mut self, document_id: DocumentId) -> Self {
        self.document_id = Some(document_id);
        self
    }

    /// Retrieve `top_k` clauses
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = Some(top_k);
        self
    }
}

/// Everything produced while answering a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryReport {
    /// Decision log id, when the report was logged
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Completion time (Unix seconds)
    pub timestamp: u64,
    /// Document searched
    pub document_id: DocumentId,
    /// Query as submitted
    pub query: String,
    /// Query parser outcome
    pub parsed: QueryOutcome,
    /// Clauses retrieved, best first
    pub retrieved_clauses: Vec<RetrievedClause>,
    /// Decision, absent when the query could not be parsed
    pub decision: Option<DecisionOutcome>,
}

/// The document-to-decision service
pub struct Pipeline<L, M> {
    extractor: Arc<DocumentExtractor>,
    embedder: Arc<M>,
    registry: Arc<IndexRegistry>,
    query_parser: QueryParser<L>,
    retriever: Retriever<M>,
    decision_engine: DecisionEngine<L>,
    decision_log: Option<Arc<Mutex<DecisionLog>>>,
    default_top_k: usize,
}

impl<L, M> Pipeline<L, M>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    /// Wire a pipeline from its resources
    pub fn new(
        llm: Arc<L>,
        embedder: Arc<M>,
        extractor: DocumentExtractor,
        registry: Arc<IndexRegistry>,
        config: EngineConfig,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            retriever: Retriever::new(Arc::clone(&embedder)),
            embedder,
            registry,
            query_parser: QueryParser::new(Arc::clone(&llm), config.llm_timeout),
            decision_engine: DecisionEngine::new(llm, config.llm_timeout),
            decision_log: None,
            default_top_k: config.default_top_k,
        }
    }

    /// Append every completed query to `log`
    pub fn with_decision_log(mut self, log: DecisionLog) -> Self {
        self.decision_log = Some(Arc::new(Mutex::new(log)));
        self
    }

    /// The index registry
    pub fn registry(&self) -> &Arc<IndexRegistry> {
        &self.registry
    }

    /// The shared embedding model
    pub fn embedding_model(&self) -> &M {
        &self.embedder
    }

    /// Whether completed queries are persisted
    pub fn decision_log_enabled(&self) -> bool {
        self.decision_log.is_some()
    }

    /// Extract, chunk and index an upload
    ///
    /// Extraction and embedding run on the blocking pool; the finished index
    /// is inserted into the registry in one step.
    pub async fn ingest(&self, filename: &str, bytes: Vec<u8>) -> Result<IngestReport, EngineError> {
        let extractor = Arc::clone(&self.extractor);
        let name = filename.to_string();
        let document =
            tokio::task::spawn_blocking(move || extractor.extract(&name, &bytes)).await??;

        let embedder = Arc::clone(&self.embedder);
        let chunks = document.chunks;
        let index =
            tokio::task::spawn_blocking(move || VectorIndex::build(embedder.as_ref(), chunks))
                .await??;

        let document_id = DocumentId::new();
        let chunk_count = index.len();
        self.registry.insert(IndexedDocument {
            id: document_id,
            filename: filename.to_string(),
            created_at: unix_timestamp(),
            index,
        });

        info!(%document_id, filename, format = %document.format, chunk_count, "Document ingested");
        Ok(IngestReport {
            document_id,
            filename: filename.to_string(),
            format: document.format,
            chunk_count,
        })
    }

    /// Answer a query against an indexed document
    ///
    /// Parsing and retrieval run concurrently. When the query cannot be
    /// parsed the decision step is skipped and the report carries the error
    /// record with a null decision.
    ///
    /// # Errors
    ///
    /// - `InvalidQuery` if the query is blank
    /// - `InvalidTopK` if `top_k` is zero
    /// - `DocumentNotFound` if `document_id` names no held index
    /// - `EmptyIndex` if no document is held at all
    /// - `ExternalService` / `Timeout` if the LLM or embedding backend fails
    pub async fn query(&self, request: QueryRequest) -> Result<QueryReport, EngineError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(EngineError::InvalidQuery("No query provided".to_string()));
        }
        let top_k = request.top_k.unwrap_or(self.default_top_k);
        if top_k == 0 {
            return Err(EngineError::InvalidTopK);
        }

        let document = match request.document_id {
            Some(id) => self
                .registry
                .get(id)
                .ok_or(EngineError::DocumentNotFound(id))?,
            None => self.registry.latest().ok_or(EngineError::EmptyIndex)?,
        };
        let document_id = document.id;

        info!(%document_id, top_k, query_chars = query.chars().count(), "Answering query");

        let (parsed, retrieved_clauses) = tokio::try_join!(
            self.query_parser.parse(query),
            self.retriever.search(query, document, top_k),
        )?;

        let decision = match parsed.parsed() {
            Some(fields) => {
                if fields.is_empty() {
                    warn!(%document_id, "Query parser extracted no fields, deciding on clauses alone");
                }
                Some(self.decision_engine.decide(fields, &retrieved_clauses).await?)
            }
            None => {
                info!(%document_id, "Query could not be parsed, skipping decision");
                None
            }
        };

        let record = NewDecisionRecord {
            timestamp: unix_timestamp(),
            document_id: Some(document_id),
            query: query.to_string(),
            parsed,
            retrieved_clauses,
            decision,
        };
        let id = self.log_decision(&record).await;

        Ok(QueryReport {
            id,
            timestamp: record.timestamp,
            document_id,
            query: record.query,
            parsed: record.parsed,
            retrieved_clauses: record.retrieved_clauses,
            decision: record.decision,
        })
    }

    /// Append a record to the decision log, if enabled
    ///
    /// Failures are logged and never fail the query.
    async fn log_decision(&self, record: &NewDecisionRecord) -> Option<i64> {
        let log = Arc::clone(self.decision_log.as_ref()?);
        let record = record.clone();

        let result = tokio::task::spawn_blocking(move || {
            log.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .append(&record)
        })
        .await;

        match result {
            Ok(Ok(id)) => Some(id),
            Ok(Err(e)) => {
                error!(error = %e, "Failed to append decision record");
                None
            }
            Err(e) => {
                error!(error = %e, "Decision log task failed");
                None
            }
        }
    }

    async fn with_log<T, F>(&self, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&DecisionLog) -> Result<T, adjudicator_store::StoreError> + Send + 'static,
    {
        let log = Arc::clone(
            self.decision_log
                .as_ref()
                .ok_or(EngineError::DecisionLogDisabled)?,
        );
        let result = tokio::task::spawn_blocking(move || {
            let guard = log.lock().unwrap_or_else(PoisonError::into_inner);
            f(&*guard)
        })
        .await?;
        Ok(result?)
    }

    /// One decision record by id
    pub async fn decision(&self, id: i64) -> Result<Option<DecisionRecord>, EngineError> {
        self.with_log(move |log| log.get(id)).await
    }

    /// The most recent decision records, newest first
    pub async fn recent_decisions(&self, limit: usize) -> Result<Vec<DecisionRecord>, EngineError> {
        self.with_log(move |log| log.recent(limit)).await
    }

    /// Number of logged decisions
    pub async fn decision_count(&self) -> Result<usize, EngineError> {
        self.with_log(|log| log.count()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adjudicator_extractor::ExtractorConfig;
    use adjudicator_llm::MockProvider;
    use adjudicator_store::HashEmbeddingModel;

    fn pipeline(llm: MockProvider) -> Pipeline<MockProvider, HashEmbeddingModel> {
        Pipeline::new(
            Arc::new(llm),
            Arc::new(HashEmbeddingModel::new(64)),
            DocumentExtractor::new(ExtractorConfig::default()).unwrap(),
            Arc::new(IndexRegistry::default()),
            EngineConfig::default(),
        )
    }

    #[test]
    fn test_query_request_defaults() {
        let request: QueryRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.query, "");
        assert!(request.document_id.is_none());
        assert!(request.top_k.is_none());
    }

    #[tokio::test]
    async fn test_blank_query_rejected() {
        let pipeline = pipeline(MockProvider::default());
        let result = pipeline.query(QueryRequest::new("   ")).await;
        assert!(matches!(result, Err(EngineError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_query_before_upload() {
        let llm = MockProvider::default();
        let pipeline = pipeline(llm.clone());

        let result = pipeline.query(QueryRequest::new("knee surgery")).await;

        assert!(matches!(result, Err(EngineError::EmptyIndex)));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_document() {
        let pipeline = pipeline(MockProvider::default());
        let id = DocumentId::new();

        let result = pipeline
            .query(QueryRequest::new("knee surgery").for_document(id))
            .await;

        assert!(matches!(result, Err(EngineError::DocumentNotFound(missing)) if missing == id));
    }

    #[tokio::test]
    async fn test_zero_top_k() {
        let pipeline = pipeline(MockProvider::default());
        let result = pipeline
            .query(QueryRequest::new("knee").with_top_k(0))
            .await;
        assert!(matches!(result, Err(EngineError::InvalidTopK)));
    }

    #[tokio::test]
    async fn test_unsupported_upload() {
        let pipeline = pipeline(MockProvider::default());
        let result = pipeline.ingest("notes.txt", b"hello".to_vec()).await;
        assert!(matches!(result, Err(EngineError::UnsupportedFormat(_))));
        assert!(pipeline.registry().is_empty());
    }

    #[tokio::test]
    async fn test_log_access_when_disabled() {
        let pipeline = pipeline(MockProvider::default());
        assert!(!pipeline.decision_log_enabled());
        assert!(matches!(
            pipeline.recent_decisions(10).await,
            Err(EngineError::DecisionLogDisabled)
        ));
    }
}
