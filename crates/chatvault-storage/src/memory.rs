//! In-process storage backend.
//!
//! Used for development deployments (`STORAGE_BACKEND=memory`) and as the
//! default storage in tests. Blobs live only as long as the process.

use crate::keys::validate_key;
use crate::signing::UrlSigner;
use crate::traits::{collect_removals, ObjectStorage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use chatvault_core::Clock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Bytes,
    content_type: String,
}

/// Memory-backed storage implementation
#[derive(Clone)]
pub struct MemoryStorage {
    blobs: Arc<RwLock<HashMap<String, StoredBlob>>>,
    signer: UrlSigner,
}

impl MemoryStorage {
    pub fn new(base_url: impl Into<String>, signing_secret: impl AsRef<[u8]>, clock: Arc<dyn Clock>) -> Self {
        Self {
            blobs: Arc::new(RwLock::new(HashMap::new())),
            signer: UrlSigner::new(signing_secret, base_url, clock),
        }
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// Stored keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.blobs.read().await.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub async fn content_type(&self, storage_key: &str) -> Option<String> {
        self.blobs
            .read()
            .await
            .get(storage_key)
            .map(|blob| blob.content_type.clone())
    }

    /// Verify a URL issued by [`ObjectStorage::sign_url`] and read the blob it grants.
    pub async fn open_signed_url(&self, url: &str) -> StorageResult<Vec<u8>> {
        let storage_key = self.signer.verify(url)?;
        self.get(&storage_key).await
    }
}

#[async_trait]
impl ObjectStorage for MemoryStorage {
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        validate_key(storage_key)?;
        let size = data.len();

        let mut blobs = self.blobs.write().await;
        if blobs.contains_key(storage_key) {
            return Err(StorageError::AlreadyExists(storage_key.to_string()));
        }
        blobs.insert(
            storage_key.to_string(),
            StoredBlob {
                data,
                content_type: content_type.to_string(),
            },
        );
        drop(blobs);

        tracing::debug!(key = %storage_key, size_bytes = size, "Memory storage upload successful");
        Ok(())
    }

    async fn sign_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        validate_key(storage_key)?;
        if !self.blobs.read().await.contains_key(storage_key) {
            return Err(StorageError::NotFound(storage_key.to_string()));
        }
        self.signer.sign(storage_key, expires_in)
    }

    async fn remove(&self, storage_keys: &[String]) -> StorageResult<()> {
        let mut blobs = self.blobs.write().await;
        let outcomes = storage_keys
            .iter()
            .map(|key| {
                let outcome = validate_key(key).map(|()| {
                    blobs.remove(key.as_str());
                });
                (key.clone(), outcome)
            })
            .collect();
        drop(blobs);

        collect_removals(outcomes)
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        validate_key(storage_key)?;
        self.blobs
            .read()
            .await
            .get(storage_key)
            .map(|blob| blob.data.to_vec())
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        validate_key(storage_key)?;
        Ok(self.blobs.read().await.contains_key(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}
