//! HTTP request handlers.
//!
//! Upload, query, index management and decision log endpoints using axum.
//! Handlers are generic over the LLM provider and embedding model so tests
//! can run the full router against deterministic stand-ins.

use adjudicator_domain::traits::LlmProvider;
use adjudicator_domain::{DecisionRecord, DocumentId};
use adjudicator_engine::{EngineError, Pipeline, QueryReport, QueryRequest};
use adjudicator_extractor::DocumentFormat;
use adjudicator_store::{EmbeddingModel, RegistryStats};
use axum::{
    extract::{
        multipart::MultipartError, rejection::JsonRejection, DefaultBodyLimit, Multipart, Path,
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    Router as AxumRouter,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// Records returned by `GET /decisions` when no limit is given
pub const DEFAULT_DECISION_LIMIT: usize = 20;

/// Upper bound on `GET /decisions?limit=`
pub const MAX_DECISION_LIMIT: usize = 200;

/// Shared application state
pub struct AppState<L, M> {
    /// The document-to-decision pipeline
    pub pipeline: Arc<Pipeline<L, M>>,
}

impl<L, M> Clone for AppState<L, M> {
    fn clone(&self) -> Self {
        Self {
            pipeline: Arc::clone(&self.pipeline),
        }
    }
}

/// Status response for `GET /`
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    /// Always "API is running"
    pub status: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    /// Overall health status
    pub status: String,
    /// Number of indexed documents
    pub documents: usize,
    /// Embedding model in use
    pub embedding_model: String,
    /// Vector dimension of the embedding model
    pub embedding_dimension: usize,
    /// Whether completed queries are persisted
    pub decision_log: bool,
}

/// Upload response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    /// Fixed confirmation message
    pub message: String,
    /// Id to pass with later queries
    pub document_id: DocumentId,
    /// Uploaded filename
    pub filename: String,
    /// Detected format
    pub format: DocumentFormat,
    /// Number of chunks indexed
    pub chunks: usize,
}

/// One entry of `GET /documents`
#[derive(Debug, Serialize)]
pub struct DocumentSummary {
    /// Document id
    pub document_id: DocumentId,
    /// Uploaded filename
    pub filename: String,
    /// Number of chunks indexed
    pub chunks: usize,
    /// Upload time (Unix seconds)
    pub created_at: u64,
}

/// Response for `GET /documents`
#[derive(Debug, Serialize)]
pub struct DocumentListResponse {
    /// Indexed documents, oldest first
    pub documents: Vec<DocumentSummary>,
    /// Registry counters
    pub stats: RegistryStats,
}

/// Response for `DELETE /documents/:id`
#[derive(Debug, Serialize)]
pub struct RemoveResponse {
    /// Fixed confirmation message
    pub message: String,
    /// Removed document
    pub document_id: DocumentId,
}

/// Query string of `GET /decisions`
#[derive(Debug, Deserialize)]
pub struct DecisionListParams {
    /// Maximum records returned
    pub limit: Option<usize>,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
    /// Stable snake_case error kind
    pub kind: String,
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    /// Pipeline error
    Engine(EngineError),
    /// Malformed request
    BadRequest(String),
    /// Unknown resource
    NotFound(String),
    /// Multipart body could not be read
    Multipart(MultipartError),
}

/// HTTP status for a pipeline error
pub fn status_for(error: &EngineError) -> StatusCode {
    match error {
        EngineError::InvalidQuery(_) | EngineError::InvalidTopK => StatusCode::BAD_REQUEST,
        EngineError::DocumentNotFound(_) | EngineError::DecisionLogDisabled => {
            StatusCode::NOT_FOUND
        }
        EngineError::EmptyIndex => StatusCode::CONFLICT,
        EngineError::DocumentTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        EngineError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        EngineError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        EngineError::ExternalService(_) => StatusCode::BAD_GATEWAY,
        EngineError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        EngineError::Storage(_) | EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::Engine(e) => (status_for(&e), e.kind(), e.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            AppError::Multipart(e) => (e.status(), "invalid_upload", e.body_text()),
        };

        if status.is_server_error() {
            error!(status = status.as_u16(), kind, error = %message, "Request failed");
        } else {
            warn!(status = status.as_u16(), kind, error = %message, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: message,
            kind: kind.to_string(),
        });
        (status, body).into_response()
    }
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl From<MultipartError> for AppError {
    fn from(e: MultipartError) -> Self {
        AppError::Multipart(e)
    }
}

/// GET / - Liveness
async fn root() -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "API is running".to_string(),
    })
}

/// GET /health - Service status
async fn health_check<L, M>(State(state): State<AppState<L, M>>) -> Json<HealthCheckResponse>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    let pipeline = &state.pipeline;
    let model = pipeline.embedding_model();

    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        documents: pipeline.registry().len(),
        embedding_model: model.model_name().to_string(),
        embedding_dimension: model.dimension(),
        decision_log: pipeline.decision_log_enabled(),
    })
}

/// POST /upload - Index a PDF or DOCX from multipart field `file`
async fn upload<L, M>(
    State(state): State<AppState<L, M>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no filename".to_string()))?;
        let bytes = field.bytes().await?;

        let report = state.pipeline.ingest(&filename, bytes.to_vec()).await?;
        return Ok(Json(UploadResponse {
            message: "Document processed".to_string(),
            document_id: report.document_id,
            filename: report.filename,
            format: report.format,
            chunks: report.chunk_count,
        }));
    }

    Err(AppError::BadRequest("No file uploaded".to_string()))
}

/// POST /query - Parse, retrieve and decide
async fn query<L, M>(
    State(state): State<AppState<L, M>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryReport>, AppError>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    let Json(request) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let report = state.pipeline.query(request).await?;
    Ok(Json(report))
}

/// GET /documents - Indexed documents
async fn list_documents<L, M>(State(state): State<AppState<L, M>>) -> Json<DocumentListResponse>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    let registry = state.pipeline.registry();
    let documents = registry
        .list()
        .iter()
        .map(|doc| DocumentSummary {
            document_id: doc.id,
            filename: doc.filename.clone(),
            chunks: doc.chunk_count(),
            created_at: doc.created_at,
        })
        .collect();

    Json(DocumentListResponse {
        documents,
        stats: registry.stats(),
    })
}

/// DELETE /documents/:id - Drop a document's index
async fn remove_document<L, M>(
    State(state): State<AppState<L, M>>,
    Path(id): Path<String>,
) -> Result<Json<RemoveResponse>, AppError>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    let document_id = DocumentId::from_string(&id).map_err(AppError::BadRequest)?;

    state
        .pipeline
        .registry()
        .remove(document_id)
        .ok_or(AppError::Engine(EngineError::DocumentNotFound(document_id)))?;

    Ok(Json(RemoveResponse {
        message: "Document removed".to_string(),
        document_id,
    }))
}

/// GET /decisions - Most recent decision records
async fn recent_decisions<L, M>(
    State(state): State<AppState<L, M>>,
    Query(params): Query<DecisionListParams>,
) -> Result<Json<Vec<DecisionRecord>>, AppError>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    let limit = params
        .limit
        .unwrap_or(DEFAULT_DECISION_LIMIT)
        .min(MAX_DECISION_LIMIT);
    let records = state.pipeline.recent_decisions(limit).await?;
    Ok(Json(records))
}

/// GET /decisions/:id - One decision record
async fn get_decision<L, M>(
    State(state): State<AppState<L, M>>,
    Path(id): Path<i64>,
) -> Result<Json<DecisionRecord>, AppError>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    state
        .pipeline
        .decision(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Decision record not found: {}", id)))
}

/// Create the axum router with all routes
pub fn create_router<L, M>(state: AppState<L, M>, max_upload_bytes: usize) -> AxumRouter
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    AxumRouter::new()
        .route("/", get(root))
        .route("/health", get(health_check::<L, M>))
        .route("/upload", post(upload::<L, M>))
        .route("/query", post(query::<L, M>))
        .route("/documents", get(list_documents::<L, M>))
        .route("/documents/:id", delete(remove_document::<L, M>))
        .route("/decisions", get(recent_decisions::<L, M>))
        .route("/decisions/:id", get(get_decision::<L, M>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}
