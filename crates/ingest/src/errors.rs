//! Ingest error types

use folio_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("PDF parse error for {path}: {message}")]
    PdfParse { path: String, message: String },

    #[error("Unsupported file type: {0} (expected .pdf, .txt or .md)")]
    UnsupportedFile(String),

    #[error("No text found in {0}")]
    EmptyDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    App(#[from] AppError),
}
