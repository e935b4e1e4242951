//! Error types module
//!
//! `AppError` is the error type of the metadata layer and of configuration-level
//! failures. Every error in the workspace can also be classified into a
//! [`FailureKind`], the coarse taxonomy callers use to decide what to show.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Coarse classification shared by storage, metadata and lifecycle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Network or connectivity problem talking to storage or the metadata store
    Transport,
    /// The backend rejected the read or write
    Permission,
    /// The blob or row no longer exists
    NotFound,
    /// The target already exists and writes never replace it
    Conflict,
    /// A fan-out operation where some items succeeded and others failed
    PartialFailure,
    /// Caller supplied something unusable
    InvalidInput,
    /// Anything else
    Internal,
}

/// Metadata describing how an error should be presented to a caller.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "DATABASE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same call may succeed
    fn is_recoverable(&self) -> bool;

    /// Message safe to show in a toast
    fn client_message(&self) -> String;

    /// Whether details should be hidden from end users
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Static metadata per variant: (error_code, recoverable, sensitive, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, bool, LogLevel) {
    match err {
        AppError::Database(_) => ("DATABASE_ERROR", true, true, LogLevel::Error),
        AppError::Storage(_) => ("STORAGE_ERROR", true, true, LogLevel::Error),
        AppError::InvalidInput(_) => ("INVALID_INPUT", false, false, LogLevel::Debug),
        AppError::NotFound(_) => ("NOT_FOUND", false, false, LogLevel::Debug),
        AppError::Timeout(_) => ("TIMEOUT", true, false, LogLevel::Warn),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            ("INTERNAL_ERROR", false, true, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Classify into the shared failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            #[cfg(feature = "sqlx")]
            AppError::Database(err) => match err {
                SqlxError::RowNotFound => FailureKind::NotFound,
                SqlxError::Io(_)
                | SqlxError::Tls(_)
                | SqlxError::PoolTimedOut
                | SqlxError::PoolClosed
                | SqlxError::WorkerCrashed => FailureKind::Transport,
                SqlxError::Database(db) => {
                    // 42501 = insufficient_privilege
                    if db.code().as_deref() == Some("42501") {
                        FailureKind::Permission
                    } else {
                        FailureKind::Internal
                    }
                }
                _ => FailureKind::Internal,
            },
            #[cfg(not(feature = "sqlx"))]
            AppError::Database(_) => FailureKind::Transport,
            AppError::Storage(_) => FailureKind::Transport,
            AppError::Timeout(_) => FailureKind::Transport,
            AppError::InvalidInput(_) => FailureKind::InvalidInput,
            AppError::NotFound(_) => FailureKind::NotFound,
            AppError::Internal(_) | AppError::InternalWithSource { .. } => FailureKind::Internal,
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access file records".to_string(),
            AppError::Storage(_) => "Failed to access file storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Timeout(_) => "The request took too long, please try again".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal error".to_string()
            }
        }
    }
}
