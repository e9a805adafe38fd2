//! Document format detection

use crate::error::ExtractorError;
use serde::Serialize;
use std::fmt;
use std::path::Path;

/// Supported upload formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Portable Document Format
    Pdf,
    /// Office Open XML word processing document
    Docx,
}

impl DocumentFormat {
    /// Detect the format from a filename's extension (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use adjudicator_extractor::DocumentFormat;
    ///
    /// assert_eq!(DocumentFormat::from_filename("Policy.PDF").unwrap(), DocumentFormat::Pdf);
    /// assert!(DocumentFormat::from_filename("notes.txt").is_err());
    /// ```
    pub fn from_filename(filename: &str) -> Result<Self, ExtractorError> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());

        match extension.as_deref() {
            Some("pdf") => Ok(DocumentFormat::Pdf),
            Some("docx") => Ok(DocumentFormat::Docx),
            _ => Err(ExtractorError::UnsupportedFormat(filename.to_string())),
        }
    }

    /// Lowercase extension without the dot
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
