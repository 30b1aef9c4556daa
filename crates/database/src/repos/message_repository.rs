//! Repository for message data access operations.

use crate::entities::{
    ActorRef, CreateAttachmentRequest, CreateMessageRequest, Message, MessageWithReply,
};
use crate::types::{StoreError, StoreResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for message database operations
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> StoreResult<Message> {
        let sender_kind: String = row
            .try_get("sender_kind")
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let sender_id: i64 = row
            .try_get("sender_id")
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Message {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            public_id: row
                .try_get("public_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            conversation_id: row
                .try_get("conversation_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            sender: ActorRef::new(sender_kind, sender_id),
            body: row
                .try_get("body")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            attachment_id: row
                .try_get("attachment_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            reply_id: row
                .try_get("reply_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            deleted_at: row
                .try_get("deleted_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
        })
    }

    /// Reply target columns are aliased with an `r_` prefix; the join leaves
    /// them NULL when the message replies to nothing.
    fn map_reply_row(row: &SqliteRow) -> StoreResult<Option<Message>> {
        let reply_row_id: Option<i64> = row
            .try_get("r_id")
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let Some(id) = reply_row_id else {
            return Ok(None);
        };

        let sender_kind: String = row
            .try_get("r_sender_kind")
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let sender_id: i64 = row
            .try_get("r_sender_id")
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Some(Message {
            id,
            public_id: row
                .try_get("r_public_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            conversation_id: row
                .try_get("r_conversation_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            sender: ActorRef::new(sender_kind, sender_id),
            body: row
                .try_get("r_body")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            attachment_id: row
                .try_get("r_attachment_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            reply_id: row
                .try_get("r_reply_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            deleted_at: row
                .try_get("r_deleted_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            created_at: row
                .try_get("r_created_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
        }))
    }

    /// Insert a message, its attachment when one is supplied, and bump the
    /// conversation's updated_at, all in one transaction.
    pub async fn create(
        &self,
        request: &CreateMessageRequest,
        attachment: Option<&CreateAttachmentRequest>,
    ) -> StoreResult<Message> {
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let attachment_id = match attachment {
            Some(attachment) => {
                let result = sqlx::query(
                    "INSERT INTO attachments (file_path, file_name, original_name, mime_type, url, created_at)
                     VALUES (?, ?, ?, ?, ?, ?)",
                )
                .bind(&attachment.file_path)
                .bind(&attachment.file_name)
                .bind(&attachment.original_name)
                .bind(&attachment.mime_type)
                .bind(&attachment.url)
                .bind(&now)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;

                Some(result.last_insert_rowid())
            }
            None => None,
        };

        let result = sqlx::query(
            "INSERT INTO messages (public_id, conversation_id, sender_kind, sender_id, body, attachment_id, reply_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(request.conversation_id)
        .bind(&request.sender.kind)
        .bind(request.sender.id)
        .bind(&request.body)
        .bind(attachment_id)
        .bind(request.reply_id)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let message_id = result.last_insert_rowid();

        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(&now)
            .bind(request.conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(
            message_id = message_id,
            public_id = %public_id,
            conversation_id = request.conversation_id,
            sender = %request.sender,
            has_attachment = attachment_id.is_some(),
            "created new message"
        );

        Ok(Message {
            id: message_id,
            public_id,
            conversation_id: request.conversation_id,
            sender: request.sender.clone(),
            body: request.body.clone(),
            attachment_id,
            reply_id: request.reply_id,
            deleted_at: None,
            created_at: now,
        })
    }

    /// Find a message by its ID
    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, public_id, conversation_id, sender_kind, sender_id, body, attachment_id, reply_id, deleted_at, created_at
             FROM messages WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Find a message by its public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<Message>> {
        let row = sqlx::query(
            "SELECT id, public_id, conversation_id, sender_kind, sender_id, body, attachment_id, reply_id, deleted_at, created_at
             FROM messages WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Count the messages the viewer can still see: tombstones never count,
    /// and with a viewer given, messages the viewer deleted for themselves
    /// are skipped too.
    pub async fn count_visible(
        &self,
        conversation_id: i64,
        viewer: Option<&ActorRef>,
    ) -> StoreResult<i64> {
        let row = match viewer {
            Some(viewer) => sqlx::query(
                "SELECT COUNT(*) as count FROM messages m
                 WHERE m.conversation_id = ? AND m.deleted_at IS NULL
                   AND NOT EXISTS (SELECT 1 FROM actions a
                        WHERE a.target_kind = 'message' AND a.target_id = m.id
                          AND a.actor_kind = ? AND a.actor_id = ? AND a.action_type = 'delete')",
            )
            .bind(conversation_id)
            .bind(&viewer.kind)
            .bind(viewer.id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?,
            None => sqlx::query(
                "SELECT COUNT(*) as count FROM messages m
                 WHERE m.conversation_id = ? AND m.deleted_at IS NULL",
            )
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?,
        };

        row.try_get("count")
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// One window of visible messages, oldest first, each carrying its reply
    /// target when it has one. Tombstoned reply targets are still joined in
    /// so callers can render a removal notice.
    pub async fn page(
        &self,
        conversation_id: i64,
        viewer: Option<&ActorRef>,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Vec<MessageWithReply>> {
        let columns = "m.id, m.public_id, m.conversation_id, m.sender_kind, m.sender_id, m.body,
               m.attachment_id, m.reply_id, m.deleted_at, m.created_at,
               r.id as r_id, r.public_id as r_public_id, r.conversation_id as r_conversation_id,
               r.sender_kind as r_sender_kind, r.sender_id as r_sender_id, r.body as r_body,
               r.attachment_id as r_attachment_id, r.reply_id as r_reply_id,
               r.deleted_at as r_deleted_at, r.created_at as r_created_at";

        let rows = match viewer {
            Some(viewer) => sqlx::query(&format!(
                "SELECT {columns}
                 FROM messages m
                 LEFT JOIN messages r ON r.id = m.reply_id
                 WHERE m.conversation_id = ? AND m.deleted_at IS NULL
                   AND NOT EXISTS (SELECT 1 FROM actions a
                        WHERE a.target_kind = 'message' AND a.target_id = m.id
                          AND a.actor_kind = ? AND a.actor_id = ? AND a.action_type = 'delete')
                 ORDER BY m.created_at ASC, m.id ASC LIMIT ? OFFSET ?"
            ))
            .bind(conversation_id)
            .bind(&viewer.kind)
            .bind(viewer.id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?,
            None => sqlx::query(&format!(
                "SELECT {columns}
                 FROM messages m
                 LEFT JOIN messages r ON r.id = m.reply_id
                 WHERE m.conversation_id = ? AND m.deleted_at IS NULL
                 ORDER BY m.created_at ASC, m.id ASC LIMIT ? OFFSET ?"
            ))
            .bind(conversation_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?,
        };

        let messages = rows
            .iter()
            .map(|row| {
                Ok(MessageWithReply {
                    message: Self::map_row(row)?,
                    reply_to: Self::map_reply_row(row)?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(messages)
    }

    /// Whether any non-tombstoned message still replies to this one
    pub async fn has_active_reply(&self, message_id: i64) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (SELECT 1 FROM messages WHERE reply_id = ? AND deleted_at IS NULL) as present",
        )
        .bind(message_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let present: i64 = row
            .try_get("present")
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(present != 0)
    }

    /// Stamp the tombstone. The row survives so replies can keep pointing
    /// at it.
    pub async fn tombstone(&self, message_id: i64) -> StoreResult<()> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query("UPDATE messages SET deleted_at = ? WHERE id = ?")
            .bind(&now)
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::MessageNotFound);
        }

        info!(message_id = message_id, "tombstoned message");

        Ok(())
    }

    /// Physically remove the message row and its attachment in one
    /// transaction.
    pub async fn force_delete(&self, message_id: i64) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let row = sqlx::query("SELECT attachment_id FROM messages WHERE id = ?")
            .bind(message_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let Some(row) = row else {
            return Err(StoreError::MessageNotFound);
        };

        let attachment_id: Option<i64> = row
            .try_get("attachment_id")
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(message_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if let Some(attachment_id) = attachment_id {
            sqlx::query("DELETE FROM attachments WHERE id = ?")
                .bind(attachment_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(
            message_id = message_id,
            removed_attachment = attachment_id.is_some(),
            "force deleted message"
        );

        Ok(())
    }

    /// Count all messages in a conversation, tombstones included
    pub async fn count_for_conversation(&self, conversation_id: i64) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.try_get("count")
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
