//! Server error types.

use std::io;
use thiserror::Error;

use quickom_core::LinkError;
use quickom_providers::ProviderError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a meeting or session store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record with this id.
    #[error("meeting {id} not found")]
    NotFound { id: i64 },

    /// The record changed since it was read.
    #[error("meeting {id} was modified concurrently (expected {expected}, found {found})")]
    Conflict { id: i64, expected: i64, found: i64 },

    /// IO error reading or writing the store file.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The store file does not parse.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Returns true for a lost optimistic write.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Error returned by a calendar or gradebook collaborator.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct CollaboratorError(pub String);

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing or managing instances.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Provider call failed.
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Store access failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Calendar or gradebook update failed.
    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    /// A launch URL could not be built.
    #[error("launch error: {0}")]
    Link(#[from] LinkError),

    /// The meeting no longer exists on the provider.
    #[error("meeting {id} no longer exists on the provider")]
    Unavailable { id: i64 },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl SyncError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
