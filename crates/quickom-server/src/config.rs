//! Runtime configuration for the sync daemon.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{SyncError, SyncResult};

/// Default interval between reconciliation passes (one hour).
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(3600);

/// Default upper bound on a single pass.
pub const DEFAULT_RUN_DEADLINE: Duration = Duration::from_secs(600);

/// Join windows (minutes before start) a meeting may open at.
pub const JOIN_WINDOWS: [u32; 8] = [0, 5, 10, 15, 20, 30, 45, 60];

/// Default join window in minutes.
pub const DEFAULT_FIRST_ABLE_TO_JOIN: u32 = 15;

/// Settings for one sync process.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Time between reconciliation passes.
    pub interval: Duration,
    /// Longest a single pass may run.
    pub deadline: Option<Duration>,
    /// Minutes before start a participant may join.
    pub first_able_to_join: u32,
    /// JSON store file. `None` keeps records in memory.
    pub store_path: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SYNC_INTERVAL,
            deadline: Some(DEFAULT_RUN_DEADLINE),
            first_able_to_join: DEFAULT_FIRST_ABLE_TO_JOIN,
            store_path: None,
        }
    }
}

impl SyncConfig {
    /// Creates a config storing records at `store_path`.
    pub fn new(store_path: impl Into<PathBuf>) -> Self {
        Self {
            store_path: Some(store_path.into()),
            ..Default::default()
        }
    }

    /// Builder: set the pass interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Builder: set or clear the pass deadline.
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    /// Builder: set the join window.
    pub fn with_first_able_to_join(mut self, minutes: u32) -> Self {
        self.first_able_to_join = minutes;
        self
    }

    /// Checks the values against what the daemon can run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.interval.is_zero() {
            return Err(SyncError::config("sync interval must be greater than zero"));
        }
        if self.deadline.is_some_and(|d| d.is_zero()) {
            return Err(SyncError::config("sync deadline must be greater than zero"));
        }
        if !JOIN_WINDOWS.contains(&self.first_able_to_join) {
            return Err(SyncError::config(format!(
                "first_able_to_join must be one of {:?}, got {}",
                JOIN_WINDOWS, self.first_able_to_join
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = SyncConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.first_able_to_join, 15);
        assert!(config.store_path.is_none());
    }

    #[test]
    fn builder() {
        let config = SyncConfig::new("/tmp/q.json")
            .with_interval(Duration::from_secs(60))
            .with_deadline(None)
            .with_first_able_to_join(45);
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/q.json")));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert!(config.deadline.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_unknown_join_window() {
        let err = SyncConfig::default()
            .with_first_able_to_join(7)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("first_able_to_join"));
    }

    #[test]
    fn rejects_zero_durations() {
        assert!(
            SyncConfig::default()
                .with_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            SyncConfig::default()
                .with_deadline(Some(Duration::ZERO))
                .validate()
                .is_err()
        );
    }
}
