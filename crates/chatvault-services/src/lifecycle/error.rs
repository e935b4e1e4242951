use chatvault_core::{AppError, ErrorMetadata, FailureKind, LogLevel};
use chatvault_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by [`FileLifecycleManager`](super::FileLifecycleManager).
///
/// Every variant names the step that failed so the caller knows which
/// partial state the system was left in.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// Rejected before any I/O.
    #[error("Invalid upload: {0}")]
    InvalidInput(String),

    /// The blob write failed; nothing was recorded.
    #[error("Failed to store {path}: {source}")]
    StorageWrite {
        path: String,
        #[source]
        source: StorageError,
    },

    /// The blob was written but its record was not. The blob stays at `path`.
    #[error("Stored {path} but failed to record it: {source}")]
    OrphanedBlob {
        path: String,
        #[source]
        source: AppError,
    },

    #[error("Failed to list files: {0}")]
    Listing(#[source] AppError),

    /// At least one delete step failed. Both steps were attempted.
    #[error("Failed to delete file {file_id}: {}", describe_delete(.storage.as_ref(), .metadata.as_ref()))]
    Delete {
        file_id: Uuid,
        path: String,
        storage: Option<StorageError>,
        metadata: Option<AppError>,
    },
}

fn describe_delete(storage: Option<&StorageError>, metadata: Option<&AppError>) -> String {
    match (storage, metadata) {
        (Some(s), Some(m)) => format!("blob removal failed ({}); record deletion failed ({})", s, m),
        (Some(s), None) => format!("blob removal failed ({}); record deleted", s),
        (None, Some(m)) => format!("blob removed; record deletion failed ({})", m),
        (None, None) => "no failure recorded".to_string(),
    }
}

impl LifecycleError {
    /// Classify into the shared failure taxonomy.
    ///
    /// A delete where exactly one of the two steps failed is a partial failure.
    pub fn kind(&self) -> FailureKind {
        match self {
            LifecycleError::InvalidInput(_) => FailureKind::InvalidInput,
            LifecycleError::StorageWrite { source, .. } => source.kind(),
            LifecycleError::OrphanedBlob { source, .. } => source.kind(),
            LifecycleError::Listing(source) => source.kind(),
            LifecycleError::Delete {
                storage, metadata, ..
            } => match (storage, metadata) {
                (Some(s), Some(_)) => s.kind(),
                (Some(_), None) | (None, Some(_)) => FailureKind::PartialFailure,
                (None, None) => FailureKind::Internal,
            },
        }
    }

    /// Storage key of a blob left without a record, if any.
    pub fn orphaned_path(&self) -> Option<&str> {
        match self {
            LifecycleError::OrphanedBlob { path, .. } => Some(path),
            _ => None,
        }
    }
}

impl ErrorMetadata for LifecycleError {
    fn error_code(&self) -> &'static str {
        match self {
            LifecycleError::InvalidInput(_) => "INVALID_INPUT",
            LifecycleError::StorageWrite { .. } => "STORAGE_WRITE_FAILED",
            LifecycleError::OrphanedBlob { .. } => "RECORD_WRITE_FAILED",
            LifecycleError::Listing(_) => "LISTING_FAILED",
            LifecycleError::Delete { .. } => "DELETE_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(
            self.kind(),
            FailureKind::Transport | FailureKind::PartialFailure | FailureKind::Conflict
        )
    }

    fn client_message(&self) -> String {
        match self {
            LifecycleError::InvalidInput(msg) => msg.clone(),
            LifecycleError::StorageWrite { .. } => "Upload failed, please try again".to_string(),
            LifecycleError::OrphanedBlob { .. } => {
                "The file was uploaded but could not be added to the conversation".to_string()
            }
            LifecycleError::Listing(_) => "Could not load the conversation's files".to_string(),
            LifecycleError::Delete { .. } => "The file could not be fully deleted".to_string(),
        }
    }

    fn is_sensitive(&self) -> bool {
        !matches!(self, LifecycleError::InvalidInput(_))
    }

    fn log_level(&self) -> LogLevel {
        match self {
            LifecycleError::InvalidInput(_) => LogLevel::Debug,
            LifecycleError::OrphanedBlob { .. } | LifecycleError::Delete { .. } => LogLevel::Warn,
            LifecycleError::StorageWrite { .. } | LifecycleError::Listing(_) => LogLevel::Error,
        }
    }
}
