//! Low-level MuPDF Wrapper
//!
//! MuPDF's `fz_context` is **NOT thread-safe**. Instead of sharing a live
//! `mupdf::Document` between threads, [`SafeDocument`] keeps the raw bytes and
//! opens a fresh document for every operation. No handle is shared, so no
//! lock is needed.
//!
//! # Usage
//!
//! ```rust,ignore
//! let doc = SafeDocument::from_bytes(Arc::new(pdf_bytes), "report.pdf".into())?;
//!
//! let width = doc.with_doc(|d| {
//!     let page = d.load_page(0)?;
//!     Ok(page.bounds()?.x1)
//! })?;
//! ```

mod safe;

pub use safe::SafeDocument;

/// MIME type MuPDF uses to pick the PDF handler
pub const PDF_MIME: &str = "application/pdf";
