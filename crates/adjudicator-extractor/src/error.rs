//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur while turning an upload into chunks
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// The file extension is not .pdf or .docx
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    /// The format parser could not read the file
    #[error("Failed to extract text: {0}")]
    Extraction(String),

    /// The file was read but holds no text
    #[error("Document contains no extractable text")]
    EmptyDocument,

    /// The upload exceeds the configured size limit
    #[error("Document too large: {size} bytes (max: {max})")]
    DocumentTooLarge {
        /// Upload size in bytes
        size: usize,
        /// Configured limit in bytes
        max: usize,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<zip::result::ZipError> for ExtractorError {
    fn from(e: zip::result::ZipError) -> Self {
        ExtractorError::Extraction(format!("Invalid DOCX container: {}", e))
    }
}

impl From<quick_xml::Error> for ExtractorError {
    fn from(e: quick_xml::Error) -> Self {
        ExtractorError::Extraction(format!("Invalid DOCX markup: {}", e))
    }
}
