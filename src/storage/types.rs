//! Storage types

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Prefix for in-progress writes. Readers never match it.
pub const PARTIAL_PREFIX: &str = ".partial-";

/// Logical directory inside the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Directory {
    /// Uploaded source documents
    Sources,
    /// Generated output artifacts
    Outputs,
}

impl Directory {
    pub const ALL: [Directory; 2] = [Directory::Sources, Directory::Outputs];

    /// Label used in logs and stats payloads
    pub fn label(self) -> &'static str {
        match self {
            Directory::Sources => "uploads",
            Directory::Outputs => "output",
        }
    }
}

/// A regular file found while listing a directory
#[derive(Debug, Clone)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
}

impl StoredFile {
    pub fn modified_utc(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from(self.modified)
    }
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid filename: {0:?}")]
    InvalidName(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub(crate) fn from_io(err: std::io::Error, name: &str) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(name.to_string())
        } else {
            StorageError::Io(err)
        }
    }
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Directory parts (either separator) are dropped, control characters are
/// removed and leading dots are stripped so a name can never be hidden or
/// collide with an in-progress write.
pub fn sanitize_filename(raw: &str) -> Result<String, StorageError> {
    let base = raw
        .rsplit(|c| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();

    if cleaned.is_empty() {
        return Err(StorageError::InvalidName(raw.to_string()));
    }

    Ok(cleaned)
}
