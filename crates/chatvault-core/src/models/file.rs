use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Longest file name accepted for an attachment.
pub const MAX_FILE_NAME_LEN: u64 = 255;

/// One uploaded attachment as recorded in the metadata store.
///
/// Records are immutable once created; there is no update path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: String,
    pub file_name: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for the metadata store. `id` and `created_at` are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct NewFileRecord {
    #[validate(length(min = 1, message = "conversation id must not be empty"))]
    pub conversation_id: String,
    #[validate(length(min = 1, message = "sender id must not be empty"))]
    pub sender_id: String,
    #[validate(length(min = 1, max = 255, message = "file name must be 1-255 characters"))]
    pub file_name: String,
    #[validate(length(min = 1))]
    pub file_path: String,
}

/// A record plus a freshly signed read URL.
///
/// `file_url` is `None` when signing failed; it is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessibleFile {
    #[serde(flatten)]
    pub record: FileRecord,
    pub file_url: Option<String>,
}

impl AccessibleFile {
    pub fn new(record: FileRecord, file_url: Option<String>) -> Self {
        Self { record, file_url }
    }

    pub fn id(&self) -> Uuid {
        self.record.id
    }

    pub fn file_name(&self) -> &str {
        &self.record.file_name
    }

    pub fn has_url(&self) -> bool {
        self.file_url.is_some()
    }
}

impl AsRef<FileRecord> for FileRecord {
    fn as_ref(&self) -> &FileRecord {
        self
    }
}

impl AsRef<FileRecord> for AccessibleFile {
    fn as_ref(&self) -> &FileRecord {
        &self.record
    }
}

impl From<AccessibleFile> for FileRecord {
    fn from(file: AccessibleFile) -> Self {
        file.record
    }
}

/// A file handed over by the caller for upload.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Declared content type, or `application/octet-stream`.
    pub fn content_type(&self) -> &str {
        self.content_type
            .as_deref()
            .unwrap_or("application/octet-stream")
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
