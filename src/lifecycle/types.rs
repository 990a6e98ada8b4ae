//! Lifecycle types

use std::time::Duration;

use serde::Serialize;

use crate::config::CleanupConfig;

/// Schedule and retention for the background sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanupPolicy {
    /// Time between sweeps. The first sweep runs one interval after start.
    pub interval: Duration,
    /// Files modified at or before `now - max_age` are deleted
    pub max_age: Duration,
}

impl From<&CleanupConfig> for CleanupPolicy {
    fn from(config: &CleanupConfig) -> Self {
        Self {
            interval: config.interval(),
            max_age: config.max_age(),
        }
    }
}

/// Files removed by one sweep or purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub uploads_removed: usize,
    pub outputs_removed: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.uploads_removed + self.outputs_removed
    }
}

/// Snapshot of one artifact directory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DirectoryStats {
    pub file_count: usize,
    pub total_size: u64,
    pub oldest_file: Option<String>,
    pub oldest_file_age_minutes: Option<f64>,
}

/// Snapshot of both artifact directories
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanupStats {
    pub uploads: DirectoryStats,
    pub output: DirectoryStats,
}
