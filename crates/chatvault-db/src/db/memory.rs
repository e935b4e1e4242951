//! In-process file record store.
//!
//! Mirrors the Postgres repository's contract: ids are random v4 UUIDs,
//! `created_at` comes from the injected clock, listings are most recent first
//! with later inserts winning ties.

use crate::db::file_record::FileRecordStore;
use async_trait::async_trait;
use chatvault_core::models::{FileRecord, NewFileRecord};
use chatvault_core::{AppError, Clock};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

#[derive(Default)]
struct Inner {
    // (insertion sequence, record)
    rows: Vec<(u64, FileRecord)>,
    next_seq: u64,
}

#[derive(Clone)]
pub struct MemoryFileRecordStore {
    inner: Arc<RwLock<Inner>>,
    clock: Arc<dyn Clock>,
}

impl MemoryFileRecordStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            clock,
        }
    }

    /// Total number of rows across all conversations.
    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rows.is_empty()
    }

    /// Number of rows for one conversation.
    pub async fn count_for(&self, conversation_id: &str) -> usize {
        self.inner
            .read()
            .await
            .rows
            .iter()
            .filter(|(_, r)| r.conversation_id == conversation_id)
            .count()
    }
}

#[async_trait]
impl FileRecordStore for MemoryFileRecordStore {
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        record.validate()?;

        let mut inner = self.inner.write().await;
        if inner.rows.iter().any(|(_, r)| r.file_path == record.file_path) {
            return Err(AppError::InvalidInput(format!(
                "A file is already recorded at {}",
                record.file_path
            )));
        }

        let created = FileRecord {
            id: Uuid::new_v4(),
            conversation_id: record.conversation_id,
            sender_id: record.sender_id,
            file_name: record.file_name,
            file_path: record.file_path,
            created_at: self.clock.now(),
        };

        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.rows.push((seq, created.clone()));

        Ok(created)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<FileRecord>, AppError> {
        let inner = self.inner.read().await;
        let mut rows: Vec<&(u64, FileRecord)> = inner
            .rows
            .iter()
            .filter(|(_, r)| r.conversation_id == conversation_id)
            .collect();

        rows.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });

        Ok(rows.into_iter().map(|(_, r)| r.clone()).collect())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        self.inner.write().await.rows.retain(|(_, r)| r.id != id);
        Ok(())
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .iter()
            .find(|(_, r)| r.id == id)
            .map(|(_, r)| r.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatvault_core::ManualClock;
    use std::time::Duration;

    fn new_record(conversation_id: &str, name: &str) -> NewFileRecord {
        NewFileRecord {
            conversation_id: conversation_id.to_string(),
            sender_id: "u1".to_string(),
            file_name: name.to_string(),
            file_path: format!("conversation_{}/{}", conversation_id, name),
        }
    }

    fn store() -> (MemoryFileRecordStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::at_millis(1_700_000_000_000));
        (MemoryFileRecordStore::new(clock.clone()), clock)
    }

    #[tokio::test]
    async fn insert_assigns_id_and_timestamp() {
        let (store, clock) = store();
        let record = store.insert(new_record("c1", "a.txt")).await.unwrap();

        assert_eq!(record.created_at, clock.now());
        assert_eq!(record.conversation_id, "c1");
        assert_eq!(store.get_by_id(record.id).await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn listing_is_most_recent_first() {
        let (store, clock) = store();
        let mut inserted = Vec::new();
        for i in 0..5 {
            inserted.push(store.insert(new_record("c1", &format!("{i}.txt"))).await.unwrap());
            clock.advance(Duration::from_millis(10));
        }
        store.insert(new_record("other", "x.txt")).await.unwrap();

        let listed = store.list_by_conversation("c1").await.unwrap();
        assert_eq!(listed.len(), 5);
        assert!(listed
            .windows(2)
            .all(|pair| pair[0].created_at > pair[1].created_at));
        assert_eq!(listed[0].id, inserted[4].id);
    }

    #[tokio::test]
    async fn equal_timestamps_fall_back_to_insertion_order() {
        let (store, _) = store();
        let first = store.insert(new_record("c1", "a.txt")).await.unwrap();
        let second = store.insert(new_record("c1", "b.txt")).await.unwrap();

        let listed = store.list_by_conversation("c1").await.unwrap();
        assert_eq!(listed, vec![second, first]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (store, _) = store();
        let record = store.insert(new_record("c1", "a.txt")).await.unwrap();

        store.delete_by_id(record.id).await.unwrap();
        store.delete_by_id(record.id).await.unwrap();
        assert!(store.list_by_conversation("c1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_path_rejected() {
        let (store, _) = store();
        store.insert(new_record("c1", "a.txt")).await.unwrap();
        assert!(store.insert(new_record("c1", "a.txt")).await.is_err());
        assert_eq!(store.count_for("c1").await, 1);
    }

    #[tokio::test]
    async fn invalid_record_rejected() {
        let (store, _) = store();
        let result = store.insert(new_record("c1", "")).await;
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
        assert!(store.is_empty().await);
    }
}
