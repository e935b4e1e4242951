use super::error::LifecycleError;
use chatvault_core::config::DEFAULT_PATH_PREFIX;
use chatvault_core::models::{AccessibleFile, FileRecord, FileUpload, NewFileRecord};
use chatvault_core::{AppError, Clock, Config};
use chatvault_db::FileRecordStore;
use chatvault_storage::{conversation_file_key, ObjectStorage, StorageError, StorageResult};
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

/// Tunables for [`FileLifecycleManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleSettings {
    /// Lifetime of every URL returned by `list`.
    pub signed_url_ttl: Duration,
    /// Prepended to the conversation id in every storage key.
    pub path_prefix: String,
    /// Upper bound on in-flight signing calls during a single `list`.
    pub max_concurrent_signatures: usize,
    /// Per-call limit on storage and metadata operations. `None` waits indefinitely.
    pub operation_timeout: Option<Duration>,
}

impl Default for LifecycleSettings {
    fn default() -> Self {
        Self {
            signed_url_ttl: Duration::from_secs(3600),
            path_prefix: DEFAULT_PATH_PREFIX.to_string(),
            max_concurrent_signatures: 16,
            operation_timeout: None,
        }
    }
}

impl LifecycleSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            signed_url_ttl: config.signed_url_ttl(),
            path_prefix: config.storage_path_prefix().to_string(),
            max_concurrent_signatures: config.max_concurrent_signatures(),
            operation_timeout: config.operation_timeout(),
        }
    }
}

/// Upload, list and delete conversation attachments.
///
/// Blobs go to object storage, one metadata row per blob goes to the record
/// store. The two writes are not transactional: each operation documents the
/// state it leaves behind when one step fails.
#[derive(Clone)]
pub struct FileLifecycleManager {
    storage: Arc<dyn ObjectStorage>,
    records: Arc<dyn FileRecordStore>,
    clock: Arc<dyn Clock>,
    settings: LifecycleSettings,
}

impl FileLifecycleManager {
    pub fn new(
        storage: Arc<dyn ObjectStorage>,
        records: Arc<dyn FileRecordStore>,
        clock: Arc<dyn Clock>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            storage,
            records,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &LifecycleSettings {
        &self.settings
    }

    pub fn storage(&self) -> &Arc<dyn ObjectStorage> {
        &self.storage
    }

    /// Storage key for `file_name` uploaded to `conversation_id` at `uploaded_at_ms`.
    pub fn storage_path(&self, conversation_id: &str, uploaded_at_ms: i64, file_name: &str) -> String {
        conversation_file_key(
            &self.settings.path_prefix,
            conversation_id,
            uploaded_at_ms,
            file_name,
        )
    }

    /// Store the blob, then record it.
    ///
    /// A failed blob write leaves nothing behind. Storage writes are create-only,
    /// so a key already taken by another upload fails here as
    /// [`LifecycleError::StorageWrite`] and the existing blob is untouched. A
    /// failed record insert leaves the new blob in storage and is reported as
    /// [`LifecycleError::OrphanedBlob`].
    #[tracing::instrument(
        skip(self, file),
        fields(file_name = %file.name, size_bytes = file.len())
    )]
    pub async fn upload(
        &self,
        conversation_id: &str,
        sender_id: &str,
        file: FileUpload,
    ) -> Result<FileRecord, LifecycleError> {
        let uploaded_at_ms = self.clock.now().timestamp_millis();
        let path = self.storage_path(conversation_id, uploaded_at_ms, &file.name);

        let new_record = NewFileRecord {
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            file_name: file.name.clone(),
            file_path: path.clone(),
        };
        new_record
            .validate()
            .map_err(|e| LifecycleError::InvalidInput(e.to_string()))?;

        let content_type = file.content_type().to_string();
        let start = std::time::Instant::now();

        if let Err(source) = self
            .storage_call("put", self.storage.put(&path, file.bytes, &content_type))
            .await
        {
            tracing::error!(
                error = %source,
                key = %path,
                "Blob upload failed; no record written"
            );
            return Err(LifecycleError::StorageWrite { path, source });
        }

        match self.record_call("insert", self.records.insert(new_record)).await {
            Ok(record) => {
                tracing::info!(
                    file_id = %record.id,
                    key = %path,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "File uploaded"
                );
                Ok(record)
            }
            Err(source) => {
                tracing::warn!(
                    error = %source,
                    key = %path,
                    "Record insert failed after blob upload; blob left orphaned"
                );
                Err(LifecycleError::OrphanedBlob { path, source })
            }
        }
    }

    /// Records of a conversation, most recent first, each with a fresh signed URL.
    ///
    /// Signing runs concurrently and keeps the record order. An entry whose URL
    /// could not be signed is returned with `file_url: None`.
    #[tracing::instrument(skip(self))]
    pub async fn list(&self, conversation_id: &str) -> Result<Vec<AccessibleFile>, LifecycleError> {
        let records = self
            .record_call("list", self.records.list_by_conversation(conversation_id))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to list file records");
                LifecycleError::Listing(e)
            })?;

        let ttl = self.settings.signed_url_ttl;
        let concurrency = self.settings.max_concurrent_signatures.max(1);

        let files: Vec<AccessibleFile> = stream::iter(records)
            .map(|record| async move {
                let file_url = match self
                    .storage_call("sign_url", self.storage.sign_url(&record.file_path, ttl))
                    .await
                {
                    Ok(url) => Some(url),
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            file_id = %record.id,
                            key = %record.file_path,
                            "Failed to sign file URL"
                        );
                        None
                    }
                };
                AccessibleFile::new(record, file_url)
            })
            .buffered(concurrency)
            .collect()
            .await;

        tracing::debug!(count = files.len(), "Listed conversation files");
        Ok(files)
    }

    /// Remove the blob, then the record. The record deletion is attempted even
    /// when the blob removal failed; neither step is rolled back.
    #[tracing::instrument(skip(self, file), fields(file_id = %file.as_ref().id))]
    pub async fn delete<F>(&self, file: &F) -> Result<(), LifecycleError>
    where
        F: AsRef<FileRecord> + Sync + ?Sized,
    {
        let file = file.as_ref();

        let storage = self
            .storage_call(
                "remove",
                self.storage.remove(std::slice::from_ref(&file.file_path)),
            )
            .await
            .err();
        if let Some(ref e) = storage {
            tracing::warn!(
                error = %e,
                key = %file.file_path,
                "Blob removal failed; deleting record anyway"
            );
        }

        let metadata = self
            .record_call("delete", self.records.delete_by_id(file.id))
            .await
            .err();
        if let Some(ref e) = metadata {
            tracing::error!(error = %e, "Failed to delete file record");
        }

        match (storage, metadata) {
            (None, None) => {
                tracing::info!(key = %file.file_path, "File deleted");
                Ok(())
            }
            (storage, metadata) => Err(LifecycleError::Delete {
                file_id: file.id,
                path: file.file_path.clone(),
                storage,
                metadata,
            }),
        }
    }

    async fn storage_call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        match self.settings.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(StorageError::Transport(format!(
                    "storage {} timed out after {:?}",
                    operation, limit
                )))
            }),
            None => call.await,
        }
    }

    async fn record_call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, AppError>>,
    ) -> Result<T, AppError> {
        match self.settings.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.unwrap_or_else(|_| {
                Err(AppError::Timeout(format!(
                    "record {} timed out after {:?}",
                    operation, limit
                )))
            }),
            None => call.await,
        }
    }
}
