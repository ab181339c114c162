//! Command implementations.
//!
//! The command line runs without a host LMS. Grades awarded on launch are kept
//! in the store file; the calendar and course cache are the in-process
//! implementations from `quickom-server`.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use quickom_providers::quickom::QuickomProvider;
use quickom_server::{InstanceManager, LocalStore, MemoryCalendar, MemoryCourseCache, Reconciler};

use crate::config::ClientConfig;
use crate::error::ClientResult;

pub mod check;
pub mod config;
pub mod import;
pub mod meetings;
pub mod privacy;
pub mod sync;
pub mod watch;

/// Everything a command needs: configuration and the opened store.
pub struct Context {
    pub config: ClientConfig,
    pub store: Arc<LocalStore>,
}

impl Context {
    /// Opens the store named by `store_override` or the configuration.
    pub fn open(config: ClientConfig, store_override: Option<PathBuf>) -> ClientResult<Self> {
        let path = store_override.unwrap_or_else(|| config.store_path());
        debug!(path = %path.display(), "opening store");
        let store = Arc::new(LocalStore::open(path)?);
        Ok(Self { config, store })
    }

    /// Builds the provider client from the configuration.
    pub fn provider(&self) -> ClientResult<Arc<QuickomProvider>> {
        let provider_config = self.config.provider_config()?;
        Ok(Arc::new(QuickomProvider::with_budget(
            provider_config,
            self.config.call_budget(),
        )?))
    }

    /// Reconciler over the store and in-process collaborators.
    pub fn reconciler(&self, provider: Arc<QuickomProvider>) -> Reconciler {
        Reconciler::new(
            provider,
            self.store.clone(),
            Arc::new(MemoryCalendar::new()),
            Arc::new(MemoryCourseCache::new()),
        )
    }

    /// Instance manager grading into the store.
    pub fn instances(&self, provider: Arc<QuickomProvider>) -> InstanceManager {
        InstanceManager::new(
            provider,
            self.store.clone(),
            self.store.clone(),
            Arc::new(MemoryCalendar::new()),
            self.store.clone(),
        )
    }
}
