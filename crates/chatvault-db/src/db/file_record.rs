//! File record repository: CRUD for the chat_files table.

use async_trait::async_trait;
use chatvault_core::models::{FileRecord, NewFileRecord};
use chatvault_core::AppError;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use validator::Validate;

/// Metadata store for uploaded attachments.
///
/// Rows are immutable: insert, list and delete are the whole contract.
#[async_trait]
pub trait FileRecordStore: Send + Sync {
    /// Insert a record; the store assigns `id` and `created_at`.
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError>;

    /// Records of one conversation, most recent first. Empty when there are none.
    async fn list_by_conversation(&self, conversation_id: &str)
        -> Result<Vec<FileRecord>, AppError>;

    /// Delete by id. Deleting an id that does not exist is not an error.
    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError>;

    /// Fetch a single record by id.
    async fn get_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError>;
}

/// Row type for chat_files table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct FileRecordRow {
    pub id: Uuid,
    pub conversation_id: String,
    pub sender_id: String,
    pub file_name: String,
    pub file_path: String,
    pub created_at: DateTime<Utc>,
}

impl FileRecordRow {
    pub fn into_record(self) -> FileRecord {
        FileRecord {
            id: self.id,
            conversation_id: self.conversation_id,
            sender_id: self.sender_id,
            file_name: self.file_name,
            file_path: self.file_path,
            created_at: self.created_at,
        }
    }
}

/// Postgres repository for chat_files table.
#[derive(Clone)]
pub struct FileRecordRepository {
    pool: PgPool,
}

impl FileRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRecordStore for FileRecordRepository {
    #[tracing::instrument(skip(self, record), fields(db.table = "chat_files", conversation_id = %record.conversation_id))]
    async fn insert(&self, record: NewFileRecord) -> Result<FileRecord, AppError> {
        record.validate()?;

        let row: FileRecordRow = sqlx::query_as::<Postgres, FileRecordRow>(
            r#"
            INSERT INTO chat_files (conversation_id, sender_id, file_name, file_path)
            VALUES ($1, $2, $3, $4)
            RETURNING id, conversation_id, sender_id, file_name, file_path, created_at
            "#,
        )
        .bind(&record.conversation_id)
        .bind(&record.sender_id)
        .bind(&record.file_name)
        .bind(&record.file_path)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_record())
    }

    #[tracing::instrument(skip(self), fields(db.table = "chat_files"))]
    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<FileRecord>, AppError> {
        let rows: Vec<FileRecordRow> = sqlx::query_as::<Postgres, FileRecordRow>(
            r#"
            SELECT id, conversation_id, sender_id, file_name, file_path, created_at
            FROM chat_files
            WHERE conversation_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FileRecordRow::into_record).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "chat_files", db.record_id = %id))]
    async fn delete_by_id(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM chat_files WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(record_id = %id, "File record already absent");
        }

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "chat_files", db.record_id = %id))]
    async fn get_by_id(&self, id: Uuid) -> Result<Option<FileRecord>, AppError> {
        let row: Option<FileRecordRow> = sqlx::query_as::<Postgres, FileRecordRow>(
            r#"
            SELECT id, conversation_id, sender_id, file_name, file_path, created_at
            FROM chat_files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(FileRecordRow::into_record))
    }
}
