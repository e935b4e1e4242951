//! Test doubles shared by the lifecycle and session integration tests.
//!
//! `FlakyStorage` and `FlakyRecordStore` wrap the in-memory implementations and
//! fail on demand, so every partial-failure path can be driven deterministically.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use chatvault_core::models::{FileRecord, NewFileRecord};
use chatvault_core::{AppError, Clock, ManualClock, StorageBackend};
use chatvault_db::{FileRecordStore, MemoryFileRecordStore};
use chatvault_services::{FileLifecycleManager, LifecycleSettings};
use chatvault_storage::{MemoryStorage, ObjectStorage, StorageError, StorageResult};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub const SIGNING_SECRET: &str = "0123456789abcdef0123456789abcdef";
pub const START_MILLIS: i64 = 1_700_000_000_000;

/// Memory storage that can be told to fail or stall individual operations.
pub struct FlakyStorage {
    inner: MemoryStorage,
    fail_puts: AtomicBool,
    fail_removes: AtomicBool,
    unsignable: Mutex<HashSet<String>>,
    sign_delays: Mutex<HashMap<String, Duration>>,
    put_delay: Mutex<Option<Duration>>,
}

impl FlakyStorage {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: MemoryStorage::new("memory://chatvault", SIGNING_SECRET, clock),
            fail_puts: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
            unsignable: Mutex::new(HashSet::new()),
            sign_delays: Mutex::new(HashMap::new()),
            put_delay: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }

    /// Make `sign_url` fail for this key only.
    pub fn refuse_to_sign(&self, storage_key: &str) {
        self.unsignable
            .lock()
            .unwrap()
            .insert(storage_key.to_string());
    }

    pub fn delay_signing(&self, storage_key: &str, delay: Duration) {
        self.sign_delays
            .lock()
            .unwrap()
            .insert(storage_key.to_string(), delay);
    }

    pub fn delay_puts(&self, delay: Duration) {
        *self.put_delay.lock().unwrap() = Some(delay);
    }
}

#[async_trait]
impl ObjectStorage for FlakyStorage {
    async fn put(&self, storage_key: &str, data: Bytes, content_type: &str) -> StorageResult<()> {
        let delay = *self.put_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StorageError::Transport("injected put failure".to_string()));
        }
        self.inner.put(storage_key, data, content_type).await
    }

    async fn sign_url(&self, storage_key: &str, expires_in: Duration) -> StorageResult<String> {
        let delay = self.sign_delays.lock().unwrap().get(storage_key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let refused = self.unsignable.lock().unwrap().contains(storage_key);
        if refused {
            return Err(StorageError::SigningFailed(format!(
                "injected signing failure for {}",
                storage_key
            )));
        }
        self.inner.sign_url(storage_key, expires_in).await
    }

    async fn remove(&self, storage_keys: &[String]) -> StorageResult<()> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(StorageError::PermissionDenied(
                "injected remove failure".to_string(),
            ));
        }
        self.inner.remove(storage_keys).await
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.inner.get(storage_key).await
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        self.inner.exists(storage_key).await
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

/// Memory record store with switchable failures.
pub struct FlakyRecordStore {
    inner: MemoryFileRecordStore,
    fail_inserts: AtomicBool,
    fail_lists: AtomicBool,
    fail_deletes: AtomicBool,
}

impl FlakyRecordStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: MemoryFileRecordStore::new(clock),
            fail_inserts: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    pub fn inner(&self) -> &MemoryFileRecordStore {
        &self.inner
    }

    pub fn fail_inserts(&self, fail: bool) {
        self.fail_inserts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl FileRecordStore for FlakyRecordStore {
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::Timeout("injected insert failure".to_string()));
        }
        self.inner.insert(record).await
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<FileRecord>, AppError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(AppError::Timeout("injected list failure".to_string()));
        }
        self.inner.list_by_conversation(conversation_id).await
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::Timeout("injected delete failure".to_string()));
        }
        self.inner.delete_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        self.inner.get_by_id(id).await
    }
}

/// A manager wired to flaky doubles, with handles to every collaborator.
pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub storage: Arc<FlakyStorage>,
    pub records: Arc<FlakyRecordStore>,
    pub manager: Arc<FileLifecycleManager>,
}

pub fn harness() -> Harness {
    harness_with(LifecycleSettings::default())
}

pub fn harness_with(settings: LifecycleSettings) -> Harness {
    let clock = Arc::new(ManualClock::at_millis(START_MILLIS));
    let storage = Arc::new(FlakyStorage::new(clock.clone()));
    let records = Arc::new(FlakyRecordStore::new(clock.clone()));
    let manager = Arc::new(FileLifecycleManager::new(
        storage.clone(),
        records.clone(),
        clock.clone(),
        settings,
    ));

    Harness {
        clock,
        storage,
        records,
        manager,
    }
}
