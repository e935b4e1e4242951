//! Chatvault Services
//!
//! The file lifecycle manager that composes object storage and the metadata
//! store, and the per-conversation view session callers render from.

pub mod conversation;
pub mod lifecycle;

pub use conversation::{ConversationFiles, FilesView};
pub use lifecycle::{FileLifecycleManager, LifecycleError, LifecycleSettings};

// Re-export the collaborator types callers need to construct a manager
pub use chatvault_core::models::{AccessibleFile, FileRecord, FileUpload};
pub use chatvault_db::FileRecordStore;
pub use chatvault_storage::{ObjectStorage, StorageError};
