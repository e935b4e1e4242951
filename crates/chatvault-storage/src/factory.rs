#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::S3Storage;
use crate::{MemoryStorage, ObjectStorage, StorageBackend, StorageError, StorageResult, UrlSigner};
use chatvault_core::{Clock, Config};
use std::sync::Arc;

/// Base URL used by memory-backed signed links.
const MEMORY_BASE_URL: &str = "memory://chatvault";

/// Create a storage backend based on configuration
pub async fn create_storage(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> StorageResult<Arc<dyn ObjectStorage>> {
    match config.storage_backend() {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config
                .s3_bucket()
                .map(String::from)
                .ok_or_else(|| StorageError::ConfigError("S3_BUCKET not configured".to_string()))?;
            let region = config
                .s3_region()
                .map(String::from)
                .or_else(|| config.aws_region().map(String::from))
                .ok_or_else(|| {
                    StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
                })?;
            let endpoint = config.s3_endpoint().map(String::from);

            let storage = S3Storage::new(bucket, region, endpoint).await?;
            tracing::info!(backend = "s3", "Object storage initialized");
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let base_path = config.local_storage_path().map(String::from).ok_or_else(|| {
                StorageError::ConfigError("LOCAL_STORAGE_PATH not configured".to_string())
            })?;
            let base_url = config
                .local_storage_base_url()
                .map(String::from)
                .ok_or_else(|| {
                    StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
                })?;
            let secret = signing_secret(config)?;

            let storage = LocalStorage::new(base_path, base_url, secret, clock).await?;
            tracing::info!(backend = "local", "Object storage initialized");
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),

        StorageBackend::Memory => {
            let secret = signing_secret(config)?;
            tracing::warn!(
                backend = "memory",
                "Object storage initialized in memory; blobs are lost on exit"
            );
            Ok(Arc::new(MemoryStorage::new(MEMORY_BASE_URL, secret, clock)))
        }
    }
}

/// Signer matching the URLs issued by the configured local or memory backend.
///
/// S3 URLs are presigned by the provider and cannot be verified locally.
pub fn create_url_signer(config: &Config, clock: Arc<dyn Clock>) -> StorageResult<UrlSigner> {
    let base_url = match config.storage_backend() {
        StorageBackend::S3 => {
            return Err(StorageError::ConfigError(
                "S3 URLs are presigned by the provider; open them directly".to_string(),
            ))
        }
        StorageBackend::Local => config.local_storage_base_url().ok_or_else(|| {
            StorageError::ConfigError("LOCAL_STORAGE_BASE_URL not configured".to_string())
        })?,
        StorageBackend::Memory => MEMORY_BASE_URL,
    };
    Ok(UrlSigner::new(signing_secret(config)?, base_url, clock))
}

fn signing_secret(config: &Config) -> StorageResult<&str> {
    config
        .url_signing_secret()
        .ok_or_else(|| StorageError::ConfigError("URL_SIGNING_SECRET not configured".to_string()))
}
