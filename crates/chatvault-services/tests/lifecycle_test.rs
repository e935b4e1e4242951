mod helpers;

use chatvault_core::models::FileUpload;
use chatvault_core::{FailureKind, ManualClock};
use chatvault_db::{FileRecordStore, MemoryFileRecordStore};
use chatvault_services::{FileLifecycleManager, LifecycleError, LifecycleSettings};
use chatvault_storage::{LocalStorage, MemoryStorage, ObjectStorage, StorageError};
use helpers::{harness, harness_with, SIGNING_SECRET, START_MILLIS};
use std::sync::Arc;
use std::time::Duration;

fn text_file(name: &str, body: &'static str) -> FileUpload {
    FileUpload::new(name, body.as_bytes()).with_content_type("text/plain")
}

#[tokio::test]
async fn upload_list_delete_roundtrip() {
    let h = harness();

    let record = h
        .manager
        .upload("conv42", "u1", text_file("notes.txt", "0123456789"))
        .await
        .unwrap();

    let files = h.manager.list("conv42").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name(), "notes.txt");
    assert_eq!(files[0].record.sender_id, "u1");
    let url = files[0].file_url.clone().expect("signed url");

    let body = h.storage.inner().open_signed_url(&url).await.unwrap();
    assert_eq!(body, b"0123456789".to_vec());
    assert_eq!(
        h.storage.inner().content_type(&record.file_path).await.as_deref(),
        Some("text/plain")
    );

    h.manager.delete(&files[0]).await.unwrap();

    assert!(h.manager.list("conv42").await.unwrap().is_empty());
    assert!(!h.storage.exists(&record.file_path).await.unwrap());
}

#[tokio::test]
async fn listing_is_strictly_most_recent_first() {
    let h = harness();
    for i in 0..5 {
        h.manager
            .upload("c1", "u1", text_file(&format!("{i}.txt"), "x"))
            .await
            .unwrap();
        h.clock.advance(Duration::from_secs(1));
    }

    let files = h.manager.list("c1").await.unwrap();
    let names: Vec<&str> = files.iter().map(|f| f.file_name()).collect();
    assert_eq!(names, vec!["4.txt", "3.txt", "2.txt", "1.txt", "0.txt"]);
    assert!(files
        .windows(2)
        .all(|pair| pair[0].record.created_at > pair[1].record.created_at));
}

#[tokio::test]
async fn conversations_are_isolated() {
    let h = harness();
    h.manager.upload("c1", "u1", text_file("a.txt", "a")).await.unwrap();
    h.manager.upload("c2", "u2", text_file("b.txt", "b")).await.unwrap();

    let files = h.manager.list("c1").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].file_name(), "a.txt");
    assert!(h.manager.list("unknown").await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_twice_succeeds() {
    let h = harness();
    let record = h
        .manager
        .upload("c1", "u1", text_file("a.txt", "a"))
        .await
        .unwrap();

    h.manager.delete(&record).await.unwrap();
    h.manager.delete(&record).await.unwrap();

    h.records.delete_by_id(record.id).await.unwrap();
    assert!(h.records.get_by_id(record.id).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_storage_write_records_nothing() {
    let h = harness();
    h.storage.fail_puts(true);

    let err = h
        .manager
        .upload("c1", "u1", text_file("a.txt", "a"))
        .await
        .unwrap_err();

    match &err {
        LifecycleError::StorageWrite { path, source } => {
            assert_eq!(path, "conversation_c1/1700000000000-a.txt");
            assert_eq!(source.kind(), FailureKind::Transport);
        }
        other => panic!("expected StorageWrite, got {other:?}"),
    }
    assert_eq!(h.records.inner().count_for("c1").await, 0);
    assert!(h.storage.inner().is_empty().await);
}

#[tokio::test]
async fn colliding_upload_keeps_existing_attachment() {
    let h = harness();

    let alice = h
        .manager
        .upload("c1", "alice", text_file("a.txt", "ALICE"))
        .await
        .unwrap();
    let err = h
        .manager
        .upload("c1", "bob", text_file("a.txt", "BOB"))
        .await
        .unwrap_err();

    match &err {
        LifecycleError::StorageWrite { path, source } => {
            assert_eq!(path, &alice.file_path);
            assert!(matches!(source, StorageError::AlreadyExists(_)));
        }
        other => panic!("expected StorageWrite, got {other:?}"),
    }
    assert_eq!(err.kind(), FailureKind::Conflict);
    assert!(err.orphaned_path().is_none());

    assert_eq!(h.storage.get(&alice.file_path).await.unwrap(), b"ALICE".to_vec());
    let files = h.manager.list("c1").await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].record, alice);

    // A moment later the same name gets its own key.
    h.clock.advance(Duration::from_millis(1));
    let bob = h
        .manager
        .upload("c1", "bob", text_file("a.txt", "BOB"))
        .await
        .unwrap();
    assert_ne!(bob.file_path, alice.file_path);
    assert_eq!(h.storage.get(&alice.file_path).await.unwrap(), b"ALICE".to_vec());
}

#[tokio::test]
async fn failed_insert_reports_orphaned_blob() {
    let h = harness();
    h.records.fail_inserts(true);

    let err = h
        .manager
        .upload("c1", "u1", text_file("a.txt", "a"))
        .await
        .unwrap_err();

    let path = err.orphaned_path().expect("orphaned path").to_string();
    assert!(h.storage.exists(&path).await.unwrap());
    assert!(h.records.inner().is_empty().await);
}

#[tokio::test]
async fn one_failed_signature_degrades_only_that_entry() {
    let h = harness();
    let mut records = Vec::new();
    for i in 0..5 {
        records.push(
            h.manager
                .upload("c1", "u1", text_file(&format!("{i}.txt"), "x"))
                .await
                .unwrap(),
        );
        h.clock.advance(Duration::from_millis(10));
    }

    // Later list positions finish signing first.
    for (i, record) in records.iter().enumerate() {
        h.storage
            .delay_signing(&record.file_path, Duration::from_millis(5 * i as u64));
    }
    h.storage.refuse_to_sign(&records[2].file_path);

    let files = h.manager.list("c1").await.unwrap();
    assert_eq!(files.len(), 5);

    let listed_ids: Vec<_> = files.iter().map(|f| f.id()).collect();
    let expected_ids: Vec<_> = records.iter().rev().map(|r| r.id).collect();
    assert_eq!(listed_ids, expected_ids);

    let missing: Vec<_> = files.iter().filter(|f| !f.has_url()).collect();
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].id(), records[2].id);
}

#[tokio::test]
async fn single_signature_slot_still_signs_everything() {
    let h = harness_with(LifecycleSettings {
        max_concurrent_signatures: 1,
        ..LifecycleSettings::default()
    });
    for i in 0..3 {
        h.manager
            .upload("c1", "u1", text_file(&format!("{i}.txt"), "x"))
            .await
            .unwrap();
        h.clock.advance(Duration::from_millis(1));
    }

    let files = h.manager.list("c1").await.unwrap();
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| f.has_url()));
}

#[tokio::test]
async fn listing_failure_is_reported() {
    let h = harness();
    h.manager.upload("c1", "u1", text_file("a.txt", "a")).await.unwrap();
    h.records.fail_lists(true);

    let err = h.manager.list("c1").await.unwrap_err();
    assert!(matches!(err, LifecycleError::Listing(_)));
    assert_eq!(err.kind(), FailureKind::Transport);
}

#[tokio::test]
async fn storage_path_is_deterministic() {
    let h = harness_with(LifecycleSettings {
        path_prefix: "chat_".to_string(),
        ..LifecycleSettings::default()
    });

    let record = h
        .manager
        .upload("c1", "u1", text_file("report.pdf", "%PDF"))
        .await
        .unwrap();

    assert_eq!(record.file_path, "chat_c1/1700000000000-report.pdf");
    assert_eq!(
        h.manager.storage_path("c1", START_MILLIS, "report.pdf"),
        record.file_path
    );
    assert!(h.storage.exists(&record.file_path).await.unwrap());
}

#[tokio::test]
async fn separators_in_names_stay_in_one_directory() {
    let h = harness();
    let record = h
        .manager
        .upload("team/alpha", "u1", text_file("q3/report.pdf", "x"))
        .await
        .unwrap();

    assert_eq!(record.file_name, "q3/report.pdf");
    assert_eq!(
        record.file_path,
        "conversation_team_alpha/1700000000000-q3_report.pdf"
    );
}

#[tokio::test]
async fn signed_url_expires_after_ttl() {
    let h = harness();
    h.manager.upload("c1", "u1", text_file("a.txt", "a")).await.unwrap();
    let url = h.manager.list("c1").await.unwrap()[0]
        .file_url
        .clone()
        .unwrap();

    h.clock.advance(Duration::from_secs(3600));
    assert!(h.storage.inner().open_signed_url(&url).await.is_ok());

    h.clock.advance(Duration::from_secs(1));
    let err = h.storage.inner().open_signed_url(&url).await.unwrap_err();
    assert!(matches!(err, StorageError::Expired(_)));
}

#[tokio::test]
async fn record_is_deleted_even_when_blob_removal_fails() {
    let h = harness();
    let record = h
        .manager
        .upload("c1", "u1", text_file("a.txt", "a"))
        .await
        .unwrap();
    h.storage.fail_removes(true);

    let err = h.manager.delete(&record).await.unwrap_err();
    match &err {
        LifecycleError::Delete {
            storage, metadata, ..
        } => {
            assert!(storage.is_some());
            assert!(metadata.is_none());
        }
        other => panic!("expected Delete, got {other:?}"),
    }
    assert_eq!(err.kind(), FailureKind::PartialFailure);
    assert!(h.records.get_by_id(record.id).await.unwrap().is_none());
    assert!(h.storage.exists(&record.file_path).await.unwrap());
}

#[tokio::test]
async fn failed_record_delete_is_reported_after_blob_removal() {
    let h = harness();
    let record = h
        .manager
        .upload("c1", "u1", text_file("a.txt", "a"))
        .await
        .unwrap();
    h.records.fail_deletes(true);

    let err = h.manager.delete(&record).await.unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::Delete {
            storage: None,
            metadata: Some(_),
            ..
        }
    ));
    assert!(!h.storage.exists(&record.file_path).await.unwrap());
    assert!(h.records.get_by_id(record.id).await.unwrap().is_some());

    // The listing still shows the record, now without a usable URL.
    let files = h.manager.list("c1").await.unwrap();
    assert_eq!(files.len(), 1);
    assert!(!files[0].has_url());
}

#[tokio::test]
async fn slow_storage_times_out_as_transport_failure() {
    let h = harness_with(LifecycleSettings {
        operation_timeout: Some(Duration::from_millis(20)),
        ..LifecycleSettings::default()
    });
    h.storage.delay_puts(Duration::from_millis(500));

    let err = h
        .manager
        .upload("c1", "u1", text_file("a.txt", "a"))
        .await
        .unwrap_err();

    assert!(matches!(err, LifecycleError::StorageWrite { .. }));
    assert_eq!(err.kind(), FailureKind::Transport);
    assert!(h.records.inner().is_empty().await);
}

#[tokio::test]
async fn partial_multi_path_removal_lists_both_sides() {
    let clock = Arc::new(ManualClock::at_millis(START_MILLIS));
    let storage = MemoryStorage::new("memory://chatvault", SIGNING_SECRET, clock);
    storage
        .put("conversation_c1/1-a.txt", "a".into(), "text/plain")
        .await
        .unwrap();
    storage
        .put("conversation_c1/2-b.txt", "b".into(), "text/plain")
        .await
        .unwrap();

    let err = storage
        .remove(&[
            "conversation_c1/1-a.txt".to_string(),
            "../outside.txt".to_string(),
            "conversation_c1/2-b.txt".to_string(),
        ])
        .await
        .unwrap_err();

    match err {
        StorageError::PartialFailure { removed, failed } => {
            assert_eq!(
                removed,
                vec![
                    "conversation_c1/1-a.txt".to_string(),
                    "conversation_c1/2-b.txt".to_string()
                ]
            );
            assert_eq!(failed.len(), 1);
            assert_eq!(failed[0].0, "../outside.txt");
        }
        other => panic!("expected PartialFailure, got {other:?}"),
    }
    assert!(storage.is_empty().await);
}

#[tokio::test]
async fn local_backend_serves_signed_downloads() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::at_millis(START_MILLIS));
    let storage = Arc::new(
        LocalStorage::new(
            dir.path(),
            "http://localhost:8080/files".to_string(),
            SIGNING_SECRET,
            clock.clone(),
        )
        .await
        .unwrap(),
    );
    let manager = FileLifecycleManager::new(
        storage.clone(),
        Arc::new(MemoryFileRecordStore::new(clock.clone())),
        clock,
        LifecycleSettings::default(),
    );

    let record = manager
        .upload("c1", "u1", text_file("a.txt", "hello"))
        .await
        .unwrap();
    assert!(dir.path().join(&record.file_path).exists());

    let files = manager.list("c1").await.unwrap();
    let url = files[0].file_url.clone().unwrap();
    assert!(url.starts_with("http://localhost:8080/files/"));
    assert_eq!(storage.open_signed_url(&url).await.unwrap(), b"hello".to_vec());

    manager.delete(&files[0]).await.unwrap();
    assert!(!dir.path().join(&record.file_path).exists());
    assert!(manager.list("c1").await.unwrap().is_empty());
}
