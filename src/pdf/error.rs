//! PDF processing errors

use thiserror::Error;

use crate::storage::StorageError;

/// Errors from page rasterization
#[derive(Debug, Error)]
pub enum RasterError {
    #[error("Failed to process PDF: {0}")]
    Open(String),

    #[error("Failed to render page {page}: {reason}")]
    Render { page: usize, reason: String },

    #[error("Image encoding error: {0}")]
    Image(String),

    #[error("Rendering timed out after {0} seconds")]
    Timeout(u64),

    #[error("Task join error: {0}")]
    Join(String),

    #[error(transparent)]
    Source(#[from] StorageError),
}

impl From<mupdf::Error> for RasterError {
    fn from(err: mupdf::Error) -> Self {
        RasterError::Open(err.to_string())
    }
}

/// Errors from multi-source reassembly. Any of them aborts the whole request.
#[derive(Debug, Error)]
pub enum AssemblyError {
    #[error("No pages requested")]
    EmptyRequest,

    #[error("Invalid source name: {0:?}")]
    InvalidSourceName(String),

    #[error("Source PDF not found: {0}")]
    MissingSource(String),

    #[error("Page {page} not found in {source_pdf} ({page_count} pages)")]
    PageOutOfRange {
        source_pdf: String,
        page: u32,
        page_count: usize,
    },

    #[error("Malformed source PDF {source_pdf}: {reason}")]
    Malformed { source_pdf: String, reason: String },

    #[error("Failed to build PDF: {0}")]
    Build(String),

    #[error("Failed to write PDF: {0}")]
    WriteFailure(StorageError),

    #[error("Task join error: {0}")]
    Join(String),
}

impl From<lopdf::Error> for AssemblyError {
    fn from(err: lopdf::Error) -> Self {
        AssemblyError::Build(err.to_string())
    }
}
