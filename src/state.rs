//! Application state management

use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::lifecycle::CleanupManager;
use crate::pdf::{DocumentAssembler, PageRasterizer};
use crate::security::RateLimiter;
use crate::storage::ArtifactStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    store: ArtifactStore,
    rate_limiter: RateLimiter,
    rasterizer: PageRasterizer,
    assembler: DocumentAssembler,
    cleanup: CleanupManager,
}

impl AppState {
    /// Build the state from configuration. Does not touch the filesystem.
    pub fn new(config: Config) -> Self {
        let store = ArtifactStore::new(
            config.storage.uploads_dir.clone(),
            config.storage.output_dir.clone(),
        );
        let rate_limiter = RateLimiter::new(
            config.rate_limit.requests,
            Duration::from_secs(config.rate_limit.window_secs),
        );

        Self {
            inner: Arc::new(AppStateInner {
                rasterizer: PageRasterizer::new(store.clone()),
                assembler: DocumentAssembler::new(store.clone()),
                cleanup: CleanupManager::new(store.clone()),
                rate_limiter,
                store,
                config,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the artifact store
    pub fn store(&self) -> &ArtifactStore {
        &self.inner.store
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.inner.rate_limiter
    }

    pub fn rasterizer(&self) -> &PageRasterizer {
        &self.inner.rasterizer
    }

    pub fn assembler(&self) -> &DocumentAssembler {
        &self.inner.assembler
    }

    /// Get the cleanup manager
    pub fn cleanup(&self) -> &CleanupManager {
        &self.inner.cleanup
    }
}
