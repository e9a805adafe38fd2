//! Adjudicator Server
//!
//! HTTP surface for the document-to-decision pipeline: upload a policy
//! document, then ask free-text questions against it.
//!
//! Startup builds every long-lived resource once (LLM client, embedding
//! backend, index registry, decision log) and fails fast if the LLM API key
//! or the embedding backend is unavailable.

#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod handlers;
pub mod sweeper;

use adjudicator_domain::traits::LlmProvider;
use adjudicator_engine::{EngineError, Pipeline, QueryReport, QueryRequest};
use adjudicator_extractor::{DocumentExtractor, ExtractorError};
use adjudicator_llm::{ChatCompletionsProvider, LlmError};
use adjudicator_store::{
    DecisionLog, EmbeddingBackend, EmbeddingError, EmbeddingModel, HashEmbeddingModel,
    OllamaEmbeddingModel, StoreError,
};
use config::{EmbeddingBackendKind, ServerConfig};
use handlers::{create_router, AppState};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use sweeper::IndexSweeper;
use tokio::net::TcpListener;
use tracing::info;

/// The pipeline as deployed
pub type ServicePipeline = Pipeline<ChatCompletionsProvider, EmbeddingBackend>;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The LLM client could not be built
    #[error("LLM setup failed: {0}")]
    Llm(#[from] LlmError),

    /// The embedding backend is unusable
    #[error("Embedding backend unavailable: {0}")]
    Embedding(#[from] EmbeddingError),

    /// The decision log could not be opened
    #[error("Decision log unavailable: {0}")]
    Store(#[from] StoreError),

    /// Extractor configuration was rejected
    #[error("Extractor setup failed: {0}")]
    Extractor(#[from] ExtractorError),

    /// A pipeline operation failed
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The document given to `ask` could not be read
    #[error("Failed to read {path}: {source}")]
    DocumentRead {
        /// Path that was requested
        path: std::path::PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Build the LLM client, reading the API key from the environment
pub fn build_llm(config: &ServerConfig) -> Result<ChatCompletionsProvider, ServerError> {
    let api_key = config.api_key()?;
    let provider = ChatCompletionsProvider::new(&config.llm.endpoint, &config.llm.model, api_key)?
        .with_timeout(Duration::from_secs(config.llm.timeout_secs))?
        .with_max_retries(config.llm.max_retries);
    Ok(provider)
}

/// Build the embedding backend
///
/// The Ollama backend is probed before it is returned, so a process never
/// starts serving with an unreachable model or the wrong dimension. The
/// blocking client is built and probed on the blocking pool.
pub async fn build_embedding_backend(
    config: &ServerConfig,
) -> Result<EmbeddingBackend, ServerError> {
    let settings = config.embedding.clone();
    match settings.backend {
        EmbeddingBackendKind::Hash => Ok(EmbeddingBackend::Hash(HashEmbeddingModel::new(
            settings.dimension,
        ))),
        EmbeddingBackendKind::Ollama => {
            let model = tokio::task::spawn_blocking(move || {
                let model =
                    OllamaEmbeddingModel::new(settings.endpoint, settings.model, settings.dimension)?
                        .with_timeout(Duration::from_secs(settings.timeout_secs))?
                        .with_batch_size(settings.batch_size);
                model.probe()?;
                Ok::<_, EmbeddingError>(model)
            })
            .await
            .map_err(|e| ServerError::Server(format!("Embedding setup task failed: {}", e)))??;
            Ok(EmbeddingBackend::Ollama(model))
        }
    }
}

/// Wire a pipeline from configuration and the given backends
pub fn build_pipeline<L, M>(
    config: &ServerConfig,
    llm: L,
    embedder: M,
) -> Result<Pipeline<L, M>, ServerError>
where
    L: LlmProvider + 'static,
    M: EmbeddingModel + 'static,
{
    let extractor = DocumentExtractor::new(config.extractor.clone())?;
    let pipeline = Pipeline::new(
        Arc::new(llm),
        Arc::new(embedder),
        extractor,
        Arc::new(config.index_registry()),
        config.engine_config(),
    );

    match &config.decision_log {
        Some(path) => {
            info!("Decision log: {}", path.display());
            Ok(pipeline.with_decision_log(DecisionLog::new(path)?))
        }
        None => Ok(pipeline),
    }
}

/// Build the deployed pipeline
pub async fn build_service(config: &ServerConfig) -> Result<ServicePipeline, ServerError> {
    let llm = build_llm(config)?;
    let embedder = build_embedding_backend(config).await?;
    info!(
        llm_model = %llm.model_name(),
        embedding_model = %embedder.model_name(),
        embedding_dimension = embedder.dimension(),
        "Backends ready"
    );
    build_pipeline(config, llm, embedder)
}

/// Start the HTTP server
///
/// Builds the pipeline, starts the index sweeper and serves until Ctrl+C.
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting Adjudicator server");
    info!("Bind address: {}", config.bind_addr());
    info!(
        "Index capacity: {}, idle timeout: {} seconds",
        config.index.capacity, config.index.ttl_secs
    );

    let pipeline = Arc::new(build_service(&config).await?);

    let sweeper = IndexSweeper::new(Arc::clone(pipeline.registry()), config.sweep_interval());
    tokio::spawn(sweeper.run());

    let app = create_router(AppState { pipeline }, config.max_upload_bytes);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("Server listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Index one document and answer one query against it, in-process
pub async fn ask(
    config: &ServerConfig,
    document: &Path,
    query: &str,
    top_k: Option<usize>,
) -> Result<QueryReport, ServerError> {
    let pipeline = build_service(config).await?;

    let filename = document
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| document.display().to_string());
    let bytes = tokio::fs::read(document)
        .await
        .map_err(|source| ServerError::DocumentRead {
            path: document.to_path_buf(),
            source,
        })?;

    let ingest = pipeline.ingest(&filename, bytes).await?;
    let request = QueryRequest {
        query: query.to_string(),
        document_id: Some(ingest.document_id),
        top_k,
    };
    Ok(pipeline.query(request).await?)
}
