//! Core DocumentExtractor implementation

use crate::chunking::TextChunker;
use crate::config::ExtractorConfig;
use crate::docx::extract_docx_text;
use crate::error::ExtractorError;
use crate::format::DocumentFormat;
use crate::pdf::extract_pdf_text;
use adjudicator_domain::TextChunk;
use tracing::{debug, info};

/// Text and chunks extracted from one upload
#[derive(Debug, Clone)]
pub struct ExtractedDocument {
    /// Detected format
    pub format: DocumentFormat,
    /// Full extracted text in document order
    pub text: String,
    /// Chunks in document order, indexed from zero
    pub chunks: Vec<TextChunk>,
}

/// Turns uploaded PDF and DOCX files into ordered text chunks
pub struct DocumentExtractor {
    config: ExtractorConfig,
    chunker: TextChunker,
}

impl DocumentExtractor {
    /// Create an extractor, validating the configuration
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate()?;
        let chunker = TextChunker::new(config.chunk_strategy, config.max_chunk_size);
        Ok(Self { config, chunker })
    }

    /// The active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract the plain text of an upload
    ///
    /// # Errors
    ///
    /// - `UnsupportedFormat` if the extension is not .pdf or .docx
    /// - `DocumentTooLarge` if `bytes` exceeds `max_document_bytes`
    /// - `Extraction` if the file is empty or cannot be parsed
    /// - `EmptyDocument` if the file holds no text
    pub fn extract_text(
        &self,
        filename: &str,
        bytes: &[u8],
    ) -> Result<(DocumentFormat, String), ExtractorError> {
        let format = DocumentFormat::from_filename(filename)?;

        if bytes.len() > self.config.max_document_bytes {
            return Err(ExtractorError::DocumentTooLarge {
                size: bytes.len(),
                max: self.config.max_document_bytes,
            });
        }
        if bytes.is_empty() {
            return Err(ExtractorError::Extraction("File is empty".to_string()));
        }

        let text = match format {
            DocumentFormat::Pdf => extract_pdf_text(bytes)?,
            DocumentFormat::Docx => extract_docx_text(bytes)?,
        };

        if text.trim().is_empty() {
            return Err(ExtractorError::EmptyDocument);
        }

        debug!(filename, %format, chars = text.chars().count(), "Extracted text");
        Ok((format, text))
    }

    /// Extract an upload and split it into chunks
    pub fn extract(&self, filename: &str, bytes: &[u8]) -> Result<ExtractedDocument, ExtractorError> {
        let (format, text) = self.extract_text(filename, bytes)?;
        let chunks = self.chunker.chunk(&text);

        info!(
            filename,
            %format,
            bytes = bytes.len(),
            chunks = chunks.len(),
            "Extracted document"
        );

        Ok(ExtractedDocument {
            format,
            text,
            chunks,
        })
    }
}

impl Default for DocumentExtractor {
    fn default() -> Self {
        let config = ExtractorConfig::default();
        let chunker = TextChunker::new(config.chunk_strategy, config.max_chunk_size);
        Self { config, chunker }
    }
}
