//! PDF text extraction

use crate::error::ExtractorError;
use std::panic::{self, AssertUnwindSafe};

/// Extract the text of every page in document order
///
/// Malformed input can make the PDF parser panic; such panics are reported
/// as extraction errors.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractorError> {
    let result = panic::catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem(bytes)));

    match result {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ExtractorError::Extraction(format!("Unreadable PDF: {}", e))),
        Err(_) => Err(ExtractorError::Extraction(
            "Unreadable PDF: parser aborted".to_string(),
        )),
    }
}
