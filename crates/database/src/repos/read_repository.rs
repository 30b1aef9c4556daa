//! Repository for per-actor read cursors.

use crate::entities::{ActorRef, Read};
use crate::types::{StoreError, StoreResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for read cursor database operations
pub struct ReadRepository {
    pool: SqlitePool,
}

impl ReadRepository {
    /// Create a new read repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Upsert the actor's cursor for a conversation, advancing `read_at`
    /// to now. Calling repeatedly keeps a single row.
    pub async fn upsert(&self, conversation_id: i64, actor: &ActorRef) -> StoreResult<Read> {
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO reads (conversation_id, actor_kind, actor_id, read_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT (conversation_id, actor_kind, actor_id)
             DO UPDATE SET read_at = excluded.read_at",
        )
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(
            conversation_id = conversation_id,
            actor = %actor,
            "marked conversation read"
        );

        let read = self.find(conversation_id, actor).await?;
        read.ok_or_else(|| StoreError::Database("read cursor missing after upsert".to_string()))
    }

    /// Find the actor's cursor for a conversation
    pub async fn find(&self, conversation_id: i64, actor: &ActorRef) -> StoreResult<Option<Read>> {
        let row = sqlx::query(
            "SELECT id, conversation_id, actor_kind, actor_id, read_at
             FROM reads WHERE conversation_id = ? AND actor_kind = ? AND actor_id = ?",
        )
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if let Some(row) = row {
            let actor_kind: String = row
                .try_get("actor_kind")
                .map_err(|e| StoreError::Database(e.to_string()))?;
            let actor_id: i64 = row
                .try_get("actor_id")
                .map_err(|e| StoreError::Database(e.to_string()))?;

            Ok(Some(Read {
                id: row
                    .try_get("id")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                conversation_id: row
                    .try_get("conversation_id")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
                actor: ActorRef::new(actor_kind, actor_id),
                read_at: row
                    .try_get("read_at")
                    .map_err(|e| StoreError::Database(e.to_string()))?,
            }))
        } else {
            Ok(None)
        }
    }

    /// Count messages authored by other actors after the actor's cursor;
    /// all of them when no cursor exists. Tombstoned messages never count.
    pub async fn unread_count(&self, conversation_id: i64, actor: &ActorRef) -> StoreResult<i64> {
        let read_at = self
            .find(conversation_id, actor)
            .await?
            .map(|read| read.read_at);

        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM messages m
             WHERE m.conversation_id = ?
               AND m.deleted_at IS NULL
               AND NOT (m.sender_kind = ? AND m.sender_id = ?)
               AND (? IS NULL OR m.created_at > ?)",
        )
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
        .bind(&read_at)
        .bind(&read_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.try_get("count")
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_reads.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePool::connect(&db_url).await.unwrap();

        sqlx::query(
            "CREATE TABLE reads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                actor_kind TEXT NOT NULL,
                actor_id INTEGER NOT NULL,
                read_at TEXT NOT NULL,
                UNIQUE (conversation_id, actor_kind, actor_id)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                sender_kind TEXT NOT NULL,
                sender_id INTEGER NOT NULL,
                deleted_at TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        (pool, temp_dir)
    }

    async fn insert_message(pool: &SqlitePool, conversation_id: i64, sender: &ActorRef) -> i64 {
        let result = sqlx::query(
            "INSERT INTO messages (conversation_id, sender_kind, sender_id, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(&sender.kind)
        .bind(sender.id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_row() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ReadRepository::new(pool.clone());
        let actor = ActorRef::user(1);

        let first = repo.upsert(1, &actor).await.unwrap();
        let second = repo.upsert(1, &actor).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.read_at >= first.read_at);

        let row = sqlx::query("SELECT COUNT(*) as count FROM reads")
            .fetch_one(&pool)
            .await
            .unwrap();
        let count: i64 = row.try_get("count").unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_unread_counts_all_without_cursor() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = ActorRef::user(1);
        let bob = ActorRef::user(2);

        insert_message(&pool, 1, &alice).await;
        insert_message(&pool, 1, &alice).await;
        insert_message(&pool, 1, &bob).await;

        let repo = ReadRepository::new(pool);

        // Bob never read: both of Alice's messages are unread, his own is not.
        assert_eq!(repo.unread_count(1, &bob).await.unwrap(), 2);
        assert_eq!(repo.unread_count(1, &alice).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unread_counts_after_cursor() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = ActorRef::user(1);
        let bob = ActorRef::user(2);

        insert_message(&pool, 1, &alice).await;

        let repo = ReadRepository::new(pool.clone());
        repo.upsert(1, &bob).await.unwrap();
        assert_eq!(repo.unread_count(1, &bob).await.unwrap(), 0);

        // A later message lands after the cursor.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        insert_message(&pool, 1, &alice).await;
        assert_eq!(repo.unread_count(1, &bob).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_unread_skips_tombstoned_messages() {
        let (pool, _temp_dir) = create_test_pool().await;
        let alice = ActorRef::user(1);
        let bob = ActorRef::user(2);

        let id = insert_message(&pool, 1, &alice).await;
        sqlx::query("UPDATE messages SET deleted_at = ? WHERE id = ?")
            .bind(chrono::Utc::now().to_rfc3339())
            .bind(id)
            .execute(&pool)
            .await
            .unwrap();

        let repo = ReadRepository::new(pool);
        assert_eq!(repo.unread_count(1, &bob).await.unwrap(), 0);
    }
}
