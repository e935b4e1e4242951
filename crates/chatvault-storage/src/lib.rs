//! Chatvault Storage Library
//!
//! Object storage for conversation attachments: the [`ObjectStorage`] trait and
//! its S3, local filesystem and in-memory implementations.
//!
//! # Storage key format
//!
//! Keys are conversation-scoped: `{prefix}{conversation_id}/{upload_ms}-{file_name}`,
//! with `conversation_` as the default prefix. Keys must not start with `/` and must
//! not contain `..` or empty segments. Key generation and validation live in the
//! [`keys`] module so all backends agree.
//!
//! # Signed URLs
//!
//! S3 issues native presigned GET URLs. The local and memory backends issue
//! HMAC-signed URLs through [`UrlSigner`] and can open them again with
//! `open_signed_url`, which rejects expired or tampered URLs.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use chatvault_core::StorageBackend;
pub use factory::{create_storage, create_url_signer};
pub use keys::{conversation_file_key, validate_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use signing::UrlSigner;
pub use traits::{ObjectStorage, StorageError, StorageResult};
