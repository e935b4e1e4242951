//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}{conversation_id}/{upload_ms}-{file_name}`.

use crate::traits::{StorageError, StorageResult};
use std::borrow::Cow;

/// Build the storage key for a file uploaded to a conversation.
///
/// Pure function of its inputs. Path separators inside the conversation id or the
/// file name are replaced with `_` so every conversation maps to exactly one
/// directory level; the original file name is kept in the metadata record.
pub fn conversation_file_key(
    prefix: &str,
    conversation_id: &str,
    uploaded_at_ms: i64,
    file_name: &str,
) -> String {
    format!(
        "{}{}/{}-{}",
        prefix,
        sanitize_segment(conversation_id),
        uploaded_at_ms,
        sanitize_segment(file_name)
    )
}

fn sanitize_segment(segment: &str) -> Cow<'_, str> {
    if segment.contains(['/', '\\']) {
        Cow::Owned(segment.replace(['/', '\\'], "_"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Reject keys that could escape the bucket root or address a directory.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key must be relative: {}",
            storage_key
        )));
    }
    if storage_key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid segments: {}",
            storage_key
        )));
    }
    Ok(())
}
