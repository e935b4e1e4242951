//! Chatvault Core Library
//!
//! This crate provides the domain models, error types, configuration and clock
//! abstraction shared by the storage, database and lifecycle crates.

pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use error::{AppError, ErrorMetadata, FailureKind, LogLevel};
pub use storage_types::StorageBackend;
// Note: ObjectStorage, StorageError, StorageResult live in chatvault-storage
