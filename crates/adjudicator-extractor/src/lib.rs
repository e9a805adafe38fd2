//! Adjudicator Extractor
//!
//! Converts uploaded policy documents into ordered text chunks.
//!
//! # Architecture
//!
//! ```text
//! filename + bytes → format detection → PDF / DOCX text → TextChunker → chunks
//! ```
//!
//! Chunk order equals source order, and chunk indices are dense and stable
//! for the lifetime of one extraction.
//!
//! # Example Usage
//!
//! ```no_run
//! use adjudicator_extractor::{DocumentExtractor, ExtractorConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let extractor = DocumentExtractor::new(ExtractorConfig::default())?;
//! let bytes = std::fs::read("policy.pdf")?;
//!
//! let document = extractor.extract("policy.pdf", &bytes)?;
//! println!("{} chunks", document.chunks.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod chunking;
pub mod config;
pub mod docx;
pub mod error;
pub mod extractor;
pub mod format;
pub mod pdf;


pub use chunking::TextChunker;
pub use config::{ChunkStrategy, ExtractorConfig};
pub use error::ExtractorError;
pub use extractor::{DocumentExtractor, ExtractedDocument};
pub use format::DocumentFormat;
