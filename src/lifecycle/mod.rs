//! Artifact lifecycle management
//!
//! A single background task periodically deletes aged files from both
//! artifact directories. On-demand sweeps, purges and directory statistics
//! are exposed for the admin endpoints.

mod manager;
mod types;

pub use manager::CleanupManager;
pub use types::{CleanupPolicy, CleanupStats, DirectoryStats, SweepReport};
