//! PDFToolkit Server Library
//!
//! Upload PDFs, preview their pages and reassemble pages from several
//! uploads into a new document. The server binary is in main.rs.
//!
//! # Modules
//!
//! - `pdf`: page rasterization (MuPDF) and reassembly (lopdf)
//! - `storage`: the two artifact directories
//! - `lifecycle`: background deletion of aged artifacts
//! - `security`: API keys and per-client rate limiting
//! - `routes`: the HTTP surface

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod mupdf;
pub mod pdf;
pub mod routes;
pub mod security;
pub mod state;
pub mod storage;

#[doc(hidden)]
pub mod testing;

pub use config::Config;
pub use error::AppError;
pub use routes::router;
pub use state::AppState;
