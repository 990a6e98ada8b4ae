//! Local artifact storage
//!
//! Two flat directories on the local filesystem:
//! - `uploads`: source PDFs, keyed by their sanitized filename
//! - `output`: generated PDFs, keyed by `<result_id>_<filename>`
//!
//! Filenames are the only index. Every lookup lists the directory on demand.

mod store;
mod types;

pub use store::ArtifactStore;
pub use types::*;
