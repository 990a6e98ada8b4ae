//! Cleanup manager
//!
//! Owns the background sweep task. State is `Stopped -> Running -> Stopped`;
//! the task handle sits behind an async mutex so concurrent `start`/`stop`
//! calls serialize.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

use super::types::{CleanupPolicy, CleanupStats, DirectoryStats, SweepReport};
use crate::storage::{ArtifactStore, Directory, StorageError, PARTIAL_PREFIX};

/// Manages deletion of aged artifacts
#[derive(Clone)]
pub struct CleanupManager {
    inner: Arc<CleanupManagerInner>,
}

struct CleanupManagerInner {
    store: ArtifactStore,
    task: Mutex<Option<RunningTask>>,
}

struct RunningTask {
    cancel: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl CleanupManager {
    pub fn new(store: ArtifactStore) -> Self {
        Self {
            inner: Arc::new(CleanupManagerInner {
                store,
                task: Mutex::new(None),
            }),
        }
    }

    /// Start the recurring sweep. Returns `false` if it was already running
    /// or the interval is zero.
    pub async fn start(&self, policy: CleanupPolicy) -> bool {
        if policy.interval.is_zero() {
            tracing::warn!("Refusing to start cleanup scheduler with a zero interval");
            return false;
        }

        let mut task = self.inner.task.lock().await;

        if task.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            tracing::info!("Cleanup scheduler already running");
            return false;
        }

        let (cancel, cancelled) = watch::channel(false);
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            manager.run(policy, cancelled).await;
        });

        *task = Some(RunningTask { cancel, handle });

        tracing::info!(
            interval_secs = policy.interval.as_secs(),
            max_age_secs = policy.max_age.as_secs(),
            "Started cleanup scheduler"
        );
        true
    }

    /// Cancel the sweep task and wait for it to exit.
    ///
    /// Once this returns no further deletions happen.
    pub async fn stop(&self) {
        let mut task = self.inner.task.lock().await;

        let Some(running) = task.take() else {
            return;
        };

        let _ = running.cancel.send(true);
        if let Err(e) = running.handle.await {
            tracing::error!(error = %e, "Cleanup task ended abnormally");
        }

        tracing::info!("Cleanup scheduler stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner
            .task
            .lock()
            .await
            .as_ref()
            .is_some_and(|t| !t.handle.is_finished())
    }

    async fn run(&self, policy: CleanupPolicy, mut cancelled: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                biased;
                _ = cancelled.changed() => break,
                _ = tokio::time::sleep(policy.interval) => {}
            }

            if *cancelled.borrow() {
                break;
            }

            let cutoff = cutoff_for(policy.max_age);
            self.sweep_until(cutoff, Some(&cancelled)).await;
        }

        tracing::debug!("Cleanup loop exited");
    }

    /// Delete every file at least `max_age` old from both directories
    pub async fn sweep(&self, max_age: Duration) -> SweepReport {
        self.sweep_older_than(cutoff_for(max_age)).await
    }

    /// Delete every file whose modification time is at or before `cutoff`
    pub async fn sweep_older_than(&self, cutoff: SystemTime) -> SweepReport {
        self.sweep_until(cutoff, None).await
    }

    async fn sweep_until(
        &self,
        cutoff: SystemTime,
        cancelled: Option<&watch::Receiver<bool>>,
    ) -> SweepReport {
        let report = SweepReport {
            uploads_removed: self.sweep_dir(Directory::Sources, cutoff, cancelled).await,
            outputs_removed: self.sweep_dir(Directory::Outputs, cutoff, cancelled).await,
        };

        if report.total() > 0 {
            tracing::info!(
                uploads = report.uploads_removed,
                outputs = report.outputs_removed,
                "Cleaned up old files"
            );
        }

        report
    }

    async fn sweep_dir(
        &self,
        dir: Directory,
        cutoff: SystemTime,
        cancelled: Option<&watch::Receiver<bool>>,
    ) -> usize {
        let files = match self.inner.store.list(dir).await {
            Ok(files) => files,
            Err(e) => {
                tracing::error!(directory = dir.label(), error = %e, "Failed to scan directory");
                return 0;
            }
        };

        let mut removed = 0;
        for file in files.into_iter().filter(|f| f.modified <= cutoff) {
            if cancelled.is_some_and(|c| *c.borrow()) {
                break;
            }

            match self.inner.store.remove(dir, &file.name).await {
                Ok(()) => {
                    removed += 1;
                    tracing::debug!(directory = dir.label(), name = %file.name, "Removed old file");
                }
                // Already gone
                Err(StorageError::NotFound(_)) => {}
                Err(e) => {
                    tracing::error!(
                        directory = dir.label(),
                        name = %file.name,
                        error = %e,
                        "Failed to remove file"
                    );
                }
            }
        }

        removed
    }

    /// Delete every file in both directories regardless of age
    pub async fn purge_all(&self) -> SweepReport {
        let report = self.sweep_older_than(far_future()).await;
        tracing::warn!(
            uploads = report.uploads_removed,
            outputs = report.outputs_removed,
            "Purged all files"
        );
        report
    }

    pub async fn stats(&self) -> Result<CleanupStats, StorageError> {
        Ok(CleanupStats {
            uploads: self.dir_stats(Directory::Sources).await?,
            output: self.dir_stats(Directory::Outputs).await?,
        })
    }

    async fn dir_stats(&self, dir: Directory) -> Result<DirectoryStats, StorageError> {
        let files: Vec<_> = self
            .inner
            .store
            .list(dir)
            .await?
            .into_iter()
            .filter(|f| !f.name.starts_with(PARTIAL_PREFIX))
            .collect();

        let oldest = files.iter().min_by_key(|f| f.modified);
        let now = SystemTime::now();

        Ok(DirectoryStats {
            file_count: files.len(),
            total_size: files.iter().map(|f| f.size).sum(),
            oldest_file: oldest.map(|f| f.name.clone()),
            oldest_file_age_minutes: oldest.map(|f| {
                now.duration_since(f.modified)
                    .unwrap_or_default()
                    .as_secs_f64()
                    / 60.0
            }),
        })
    }
}

fn cutoff_for(max_age: Duration) -> SystemTime {
    let now = SystemTime::now();
    now.checked_sub(max_age).unwrap_or(SystemTime::UNIX_EPOCH)
}

fn far_future() -> SystemTime {
    SystemTime::now() + Duration::from_secs(100 * 365 * 24 * 3600)
}
