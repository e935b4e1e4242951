//! View state for one conversation's attachment list.
//!
//! [`ConversationFiles`] owns the current [`FilesView`] and publishes every change
//! on a `tokio::sync::watch` channel so a UI can render loading and uploading
//! states without polling.

use crate::lifecycle::{FileLifecycleManager, LifecycleError};
use chatvault_core::models::{AccessibleFile, FileRecord, FileUpload};
use chatvault_core::ErrorMetadata;
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// Snapshot of a conversation's files and the operations in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilesView {
    pub files: Vec<AccessibleFile>,
    pub loading: bool,
    pub uploading: bool,
    /// Client-safe message of the most recent failure, cleared by the next successful refresh.
    pub last_error: Option<String>,
}

/// Session bound to one conversation and one sender.
pub struct ConversationFiles {
    manager: Arc<FileLifecycleManager>,
    conversation_id: String,
    sender_id: String,
    state: watch::Sender<FilesView>,
    refreshes_in_flight: AtomicUsize,
    uploads_in_flight: AtomicUsize,
}

impl ConversationFiles {
    pub fn new(
        manager: Arc<FileLifecycleManager>,
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
    ) -> Self {
        let (state, _) = watch::channel(FilesView::default());
        Self {
            manager,
            conversation_id: conversation_id.into(),
            sender_id: sender_id.into(),
            state,
            refreshes_in_flight: AtomicUsize::new(0),
            uploads_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn snapshot(&self) -> FilesView {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FilesView> {
        self.state.subscribe()
    }

    /// Re-run the listing and replace the current files.
    ///
    /// On failure the previous files stay in place and `last_error` is set.
    pub async fn refresh(&self) -> Result<(), LifecycleError> {
        self.refreshes_in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|view| view.loading = true);

        let result = self.manager.list(&self.conversation_id).await;

        let remaining = self.refreshes_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        match result {
            Ok(files) => {
                self.state.send_modify(|view| {
                    view.files = files;
                    view.loading = remaining > 0;
                    view.last_error = None;
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(
                    conversation_id = %self.conversation_id,
                    error = %e,
                    "Failed to refresh conversation files"
                );
                let message = e.client_message();
                self.state.send_modify(|view| {
                    view.loading = remaining > 0;
                    view.last_error = Some(message);
                });
                Err(e)
            }
        }
    }

    /// Upload a file as this session's sender, then refresh the list.
    ///
    /// The upload result is returned even if the follow-up refresh fails.
    pub async fn upload_file(&self, file: FileUpload) -> Result<FileRecord, LifecycleError> {
        self.uploads_in_flight.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|view| view.uploading = true);

        let result = self
            .manager
            .upload(&self.conversation_id, &self.sender_id, file)
            .await;

        let remaining = self.uploads_in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        self.state.send_modify(|view| view.uploading = remaining > 0);

        match result {
            Ok(record) => {
                // refresh records its own failure in last_error
                let _ = self.refresh().await;
                Ok(record)
            }
            Err(e) => {
                self.record_error(&e);
                Err(e)
            }
        }
    }

    /// Delete a file and refresh, whether or not every delete step succeeded.
    pub async fn delete_file<F>(&self, file: &F) -> Result<(), LifecycleError>
    where
        F: AsRef<FileRecord> + Sync + ?Sized,
    {
        let result = self.manager.delete(file).await;
        let _ = self.refresh().await;

        // the refresh clears last_error on success, so a delete failure is recorded after it
        if let Err(ref e) = result {
            self.record_error(e);
        }
        result
    }

    fn record_error(&self, err: &LifecycleError) {
        let message = err.client_message();
        self.state
            .send_modify(|view| view.last_error = Some(message));
    }
}
