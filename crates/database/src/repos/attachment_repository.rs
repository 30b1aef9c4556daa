//! Repository for attachment data access operations.

use crate::entities::{Attachment, CreateAttachmentRequest};
use crate::types::{StoreError, StoreResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for attachment database operations
pub struct AttachmentRepository {
    pool: SqlitePool,
}

impl AttachmentRepository {
    /// Create a new attachment repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new attachment row
    pub async fn create(&self, request: &CreateAttachmentRequest) -> StoreResult<Attachment> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO attachments (file_path, file_name, original_name, mime_type, url, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&request.file_path)
        .bind(&request.file_name)
        .bind(&request.original_name)
        .bind(&request.mime_type)
        .bind(&request.url)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let attachment_id = result.last_insert_rowid();

        info!(
            attachment_id = attachment_id,
            file_name = %request.file_name,
            mime_type = %request.mime_type,
            "created attachment"
        );

        Ok(Attachment {
            id: attachment_id,
            file_path: request.file_path.clone(),
            file_name: request.file_name.clone(),
            original_name: request.original_name.clone(),
            mime_type: request.mime_type.clone(),
            url: request.url.clone(),
            created_at: now,
        })
    }

    /// Find an attachment by its ID
    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<Attachment>> {
        let row = sqlx::query(
            "SELECT id, file_path, file_name, original_name, mime_type, url, created_at
             FROM attachments WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if let Some(row) = row {
            Ok(Some(Attachment {
                id: row
                    .try_get("id")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                file_path: row
                    .try_get("file_path")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                file_name: row
                    .try_get("file_name")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                original_name: row
                    .try_get("original_name")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                mime_type: row
                    .try_get("mime_type")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                url: row
                    .try_get("url")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                created_at: row
                    .try_get("created_at")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Delete an attachment by ID
    pub async fn delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AttachmentNotFound);
        }

        info!(attachment_id = id, "deleted attachment");

        Ok(())
    }
}
