use crate::keys::validate_key;
use crate::signing::UrlSigner;
use crate::traits::{collect_removals, ObjectStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chatvault_core::Clock;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem storage implementation
#[derive(Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
    signer: UrlSigner,
}

impl LocalStorage {
    /// Create a new LocalStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for blobs (e.g., "/var/lib/chatvault/files")
    /// * `base_url` - Base URL signed links point at (e.g., "http://localhost:3000/files")
    /// * `signing_secret` - HMAC key for signed URLs
    /// * `clock` - Time source for URL expiry
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signing_secret: impl AsRef<[u8]>,
        clock: Arc<dyn Clock>,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            signer: UrlSigner::new(signing_secret, base_url, clock),
        })
    }

    /// Convert storage key to filesystem path with security validation
    ///
    /// Rejects keys that would resolve outside the base storage directory.
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);

        if let (Ok(base_canonical), Ok(canonical)) =
            (self.base_path.canonicalize(), path.canonicalize())
        {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| write_error(parent, e))?;
        }
        Ok(())
    }

    async fn remove_one(&self, storage_key: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                return Err(StorageError::PermissionDenied(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    /// Verify a URL issued by [`ObjectStorage::sign_url`] and read the blob it grants.
    pub async fn open_signed_url(&self, url: &str) -> StorageResult<Vec<u8>> {
        let storage_key = self.signer.verify(url)?;
        self.get(&storage_key).await
    }
}

fn write_error(path: &Path, e: io::Error) -> StorageError {
    let message = format!("Failed to write {}: {}", path.display(), e);
    match e.kind() {
        io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(message),
        _ => StorageError::UploadFailed(message),
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, storage_key: &str, data: Bytes, _content_type: &str) -> StorageResult<()> {
        let path = self.key_to_path(storage_key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(storage_key.to_string()),
                _ => write_error(&path, e),
            })?;

        file.write_all(&data)
            .await
            .map_err(|e| write_error(&path, e))?;

        file.sync_all().await.map_err(|e| write_error(&path, e))?;

        tracing::info!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn sign_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        let path = self.key_to_path(storage_key)?;
        if !fs::try_exists(&path).await? {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        self.signer.sign(storage_key, expires_in)
    }

    async fn remove(&self, storage_keys: &[String]) -> StorageResult<()> {
        let mut outcomes = Vec::with_capacity(storage_keys.len());
        for key in storage_keys {
            outcomes.push((key.clone(), self.remove_one(key).await));
        }
        collect_removals(outcomes)
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(storage_key)?;
        let start = std::time::Instant::now();

        let data = match fs::read(&path).await {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(storage_key.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DownloadFailed(format!(
                    "Failed to read file {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        tracing::debug!(
            path = %path.display(),
            key = %storage_key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(storage_key)?;
        Ok(fs::try_exists(&path).await?)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
