//! Configuration for the Extractor

use crate::error::ExtractorError;
use serde::{Deserialize, Serialize};

/// Default maximum chunk size (characters)
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 500;

/// Default maximum upload size (20 MiB)
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 20 * 1024 * 1024;

/// Text chunking strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    /// Consecutive windows of at most `max_chunk_size` characters
    #[default]
    FixedLength,
    /// Pack blank-line separated paragraphs up to `max_chunk_size`
    ByParagraph,
}

/// Configuration for the Extractor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Text chunking strategy
    pub chunk_strategy: ChunkStrategy,

    /// Maximum chunk size (characters)
    pub max_chunk_size: usize,

    /// Maximum accepted file size (bytes)
    pub max_document_bytes: usize,
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ExtractorError> {
        if self.max_chunk_size == 0 {
            return Err(ExtractorError::Config(
                "max_chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.max_document_bytes == 0 {
            return Err(ExtractorError::Config(
                "max_document_bytes must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ExtractorError> {
        toml::from_str(toml_str)
            .map_err(|e| ExtractorError::Config(format!("Failed to parse TOML: {}", e)))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, ExtractorError> {
        toml::to_string_pretty(self)
            .map_err(|e| ExtractorError::Config(format!("Failed to serialize to TOML: {}", e)))
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            chunk_strategy: ChunkStrategy::FixedLength,
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }
}
