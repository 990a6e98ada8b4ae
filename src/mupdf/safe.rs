//! Thread-safe document wrapper for MuPDF
//!
//! Stores the source bytes and opens a fresh `mupdf::Document` for each
//! operation. No MuPDF handle outlives the closure it was opened for, so the
//! wrapper itself is `Send + Sync` without any unsafe impls.

use std::sync::Arc;

use mupdf::Document;

use super::PDF_MIME;
use crate::pdf::RasterError;

/// Thread-safe PDF handle
pub struct SafeDocument {
    data: Arc<Vec<u8>>,
    id: String,
    page_count: usize,
}

impl SafeDocument {
    /// Validate that `data` opens as a PDF and record its page count
    pub fn from_bytes(data: Arc<Vec<u8>>, id: String) -> Result<Self, RasterError> {
        let doc = Document::from_bytes(&data, PDF_MIME)?;
        let page_count = doc.page_count()?.max(0) as usize;

        Ok(Self {
            data,
            id,
            page_count,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Execute a closure against a freshly opened document.
    ///
    /// Each call parses the bytes again, so callers needing several reads
    /// should do them inside one closure. Concurrent calls never share a
    /// handle and the document is dropped when the closure returns.
    pub fn with_doc<F, R>(&self, f: F) -> Result<R, RasterError>
    where
        F: FnOnce(&Document) -> Result<R, RasterError>,
    {
        let doc = Document::from_bytes(&self.data, PDF_MIME)?;
        f(&doc)
    }
}
