//! Content extraction: OCR/document analysis, spreadsheet decoding, markdown rendering, and
//! schema-driven field extraction.

mod analyzer;
mod fields;
pub mod markdown;
mod spreadsheet;

pub use analyzer::{
    DocumentAnalysis, DocumentAnalyzer, HttpDocumentAnalyzer, UnavailableAnalyzer,
    build_document_analyzer,
};
pub use fields::FieldExtractor;
pub use spreadsheet::{CalamineReader, Sheet, SpreadsheetReader, Workbook};

use thiserror::Error;

/// Errors raised by extraction collaborators.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Collaborator was not configured or could not be reached.
    #[error("Extraction service unavailable: {0}")]
    ServiceUnavailable(String),
    /// Collaborator rejected the document or returned an unreadable payload.
    #[error("Extraction failed: {0}")]
    Failed(String),
    /// Content could not be decoded as the expected format.
    #[error("Unreadable document: {0}")]
    Unreadable(String),
}
