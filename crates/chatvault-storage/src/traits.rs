//! Storage abstraction trait
//!
//! This module defines the [`ObjectStorage`] trait every backend implements and
//! the error type shared by all of them.

use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chatvault_core::FailureKind;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("URL signing failed: {0}")]
    SigningFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Storage transport error: {0}")]
    Transport(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Signed URL expired: {0}")]
    Expired(String),

    #[error("Invalid signed URL: {0}")]
    InvalidSignature(String),

    #[error("Removed {} of {} objects; failed: {}", .removed.len(), .removed.len() + .failed.len(), format_failures(.failed))]
    PartialFailure {
        removed: Vec<String>,
        failed: Vec<(String, String)>,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

fn format_failures(failed: &[(String, String)]) -> String {
    failed
        .iter()
        .map(|(key, reason)| format!("{} ({})", key, reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl StorageError {
    /// Classify into the shared failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            StorageError::UploadFailed(_)
            | StorageError::DownloadFailed(_)
            | StorageError::DeleteFailed(_)
            | StorageError::SigningFailed(_)
            | StorageError::Transport(_) => FailureKind::Transport,
            StorageError::NotFound(_) => FailureKind::NotFound,
            StorageError::AlreadyExists(_) => FailureKind::Conflict,
            StorageError::PermissionDenied(_)
            | StorageError::Expired(_)
            | StorageError::InvalidSignature(_) => FailureKind::Permission,
            StorageError::InvalidKey(_) => FailureKind::InvalidInput,
            StorageError::PartialFailure { .. } => FailureKind::PartialFailure,
            StorageError::IoError(e) => match e.kind() {
                io::ErrorKind::NotFound => FailureKind::NotFound,
                io::ErrorKind::AlreadyExists => FailureKind::Conflict,
                io::ErrorKind::PermissionDenied => FailureKind::Permission,
                _ => FailureKind::Transport,
            },
            StorageError::ConfigError(_) => FailureKind::Internal,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Object storage abstraction
///
/// Every backend is scoped to one logical bucket. The lifecycle manager holds an
/// `Arc<dyn ObjectStorage>` so tests can substitute their own implementation.
///
/// **Key format:** see the crate root documentation.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Write `data` at `storage_key`. Create-only: an existing blob is never
    /// replaced and the call fails with [`StorageError::AlreadyExists`].
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()>;

    /// Issue a URL granting read access to the blob for `expires_in` from now.
    ///
    /// There is no refresh; callers request a new URL once it has expired.
    async fn sign_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Delete one or more blobs.
    ///
    /// Missing blobs count as removed. When only some keys could be removed the
    /// call returns [`StorageError::PartialFailure`] naming both sides.
    async fn remove(&self, storage_keys: &[String]) -> StorageResult<()>;

    /// Read a blob back.
    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>>;

    /// Check if a blob exists
    async fn exists(&self, storage_key: &str) -> StorageResult<bool>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

/// Fold per-key removal outcomes into a single result.
///
/// A lone failure is returned as-is so single-key deletes keep their precise error.
pub(crate) fn collect_removals(outcomes: Vec<(String, StorageResult<()>)>) -> StorageResult<()> {
    let total = outcomes.len();
    let mut removed = Vec::new();
    let mut failed = Vec::new();
    let mut first_error = None;

    for (key, outcome) in outcomes {
        match outcome {
            Ok(()) => removed.push(key),
            Err(e) => {
                failed.push((key, e.to_string()));
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        None => Ok(()),
        Some(e) if total == 1 => Err(e),
        Some(_) => Err(StorageError::PartialFailure { removed, failed }),
    }
}
