//! Repository for the append-only action ledger.
//!
//! Delete actions recorded here are the sole source of truth for per-actor
//! message visibility; rows are never updated and only removed when their
//! conversation is destroyed.

use crate::entities::{ActionType, ActorRef, TARGET_MESSAGE};
use crate::types::{StoreError, StoreResult};
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for action ledger database operations
pub struct ActionRepository {
    pool: SqlitePool,
}

impl ActionRepository {
    /// Create a new action repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an action. Returns `true` when a new row was written; the
    /// UNIQUE constraint makes re-recording a silent no-op.
    pub async fn record(
        &self,
        actor: &ActorRef,
        target_kind: &str,
        target_id: i64,
        action_type: ActionType,
    ) -> StoreResult<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT OR IGNORE INTO actions (actor_kind, actor_id, target_kind, target_id, action_type, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&actor.kind)
        .bind(actor.id)
        .bind(target_kind)
        .bind(target_id)
        .bind(action_type.to_string())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let recorded = result.rows_affected() > 0;

        if recorded {
            info!(
                actor = %actor,
                target_kind = target_kind,
                target_id = target_id,
                action_type = action_type.as_str(),
                "recorded action"
            );
        }

        Ok(recorded)
    }

    /// Check whether an actor has recorded an action on a target
    pub async fn has_action(
        &self,
        actor: &ActorRef,
        target_kind: &str,
        target_id: i64,
        action_type: ActionType,
    ) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (
                 SELECT 1 FROM actions
                 WHERE actor_kind = ? AND actor_id = ? AND target_kind = ? AND target_id = ? AND action_type = ?
             ) as present",
        )
        .bind(&actor.kind)
        .bind(actor.id)
        .bind(target_kind)
        .bind(target_id)
        .bind(action_type.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.try_get("present")
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Record one action per message of a conversation, tombstoned messages
    /// included, in a single statement. Returns the number of new rows.
    pub async fn record_for_all_messages(
        &self,
        actor: &ActorRef,
        conversation_id: i64,
        action_type: ActionType,
    ) -> StoreResult<u64> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT OR IGNORE INTO actions (actor_kind, actor_id, target_kind, target_id, action_type, created_at)
             SELECT ?, ?, 'message', m.id, ?, ? FROM messages m WHERE m.conversation_id = ?",
        )
        .bind(&actor.kind)
        .bind(actor.id)
        .bind(action_type.to_string())
        .bind(&now)
        .bind(conversation_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let recorded = result.rows_affected();

        info!(
            actor = %actor,
            conversation_id = conversation_id,
            recorded = recorded,
            "recorded action for all conversation messages"
        );

        Ok(recorded)
    }

    /// True when no message of the conversation, tombstoned or not, lacks a
    /// delete action by the actor. Vacuously true for an empty conversation.
    pub async fn conversation_fully_deleted_by(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT NOT EXISTS (
                 SELECT 1 FROM messages m
                 WHERE m.conversation_id = ?
                   AND NOT EXISTS (
                       SELECT 1 FROM actions a
                       WHERE a.target_kind = 'message' AND a.target_id = m.id
                         AND a.actor_kind = ? AND a.actor_id = ?
                         AND a.action_type = 'delete'
                   )
             ) as fully_deleted",
        )
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.try_get("fully_deleted")
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Count ledger rows for a target
    pub async fn count_for_target(&self, target_kind: &str, target_id: i64) -> StoreResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM actions WHERE target_kind = ? AND target_id = ?",
        )
        .bind(target_kind)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.try_get("count")
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Convenience probe for message delete actions
    pub async fn has_message_delete(
        &self,
        actor: &ActorRef,
        message_id: i64,
    ) -> StoreResult<bool> {
        self.has_action(actor, TARGET_MESSAGE, message_id, ActionType::Delete)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_actions.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePool::connect(&db_url).await.unwrap();

        sqlx::query(
            "CREATE TABLE actions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                actor_kind TEXT NOT NULL,
                actor_id INTEGER NOT NULL,
                target_kind TEXT NOT NULL,
                target_id INTEGER NOT NULL,
                action_type TEXT NOT NULL,
                created_at TEXT NOT NULL,
                UNIQUE (actor_kind, actor_id, target_kind, target_id, action_type)
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "CREATE TABLE messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                deleted_at TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        (pool, temp_dir)
    }

    async fn insert_message(pool: &SqlitePool, conversation_id: i64) -> i64 {
        let result = sqlx::query(
            "INSERT INTO messages (conversation_id, created_at) VALUES (?, ?)",
        )
        .bind(conversation_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        result.last_insert_rowid()
    }

    #[tokio::test]
    async fn test_record_and_has_action() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ActionRepository::new(pool);
        let actor = ActorRef::user(1);

        let recorded = repo
            .record(&actor, TARGET_MESSAGE, 10, ActionType::Delete)
            .await
            .unwrap();
        assert!(recorded);

        let present = repo.has_message_delete(&actor, 10).await.unwrap();
        assert!(present);

        let absent = repo.has_message_delete(&ActorRef::user(2), 10).await.unwrap();
        assert!(!absent);
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ActionRepository::new(pool);
        let actor = ActorRef::user(1);

        assert!(repo
            .record(&actor, TARGET_MESSAGE, 10, ActionType::Delete)
            .await
            .unwrap());
        assert!(!repo
            .record(&actor, TARGET_MESSAGE, 10, ActionType::Delete)
            .await
            .unwrap());

        let count = repo.count_for_target(TARGET_MESSAGE, 10).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_record_for_all_messages() {
        let (pool, _temp_dir) = create_test_pool().await;
        let first = insert_message(&pool, 1).await;
        let second = insert_message(&pool, 1).await;
        let other = insert_message(&pool, 2).await;

        let repo = ActionRepository::new(pool);
        let actor = ActorRef::user(1);

        let recorded = repo
            .record_for_all_messages(&actor, 1, ActionType::Delete)
            .await
            .unwrap();
        assert_eq!(recorded, 2);

        assert!(repo.has_message_delete(&actor, first).await.unwrap());
        assert!(repo.has_message_delete(&actor, second).await.unwrap());
        assert!(!repo.has_message_delete(&actor, other).await.unwrap());

        // Re-running records nothing new.
        let again = repo
            .record_for_all_messages(&actor, 1, ActionType::Delete)
            .await
            .unwrap();
        assert_eq!(again, 0);
    }

    #[tokio::test]
    async fn test_conversation_fully_deleted_by() {
        let (pool, _temp_dir) = create_test_pool().await;
        let first = insert_message(&pool, 1).await;
        let _second = insert_message(&pool, 1).await;

        let repo = ActionRepository::new(pool);
        let actor = ActorRef::user(1);

        assert!(!repo.conversation_fully_deleted_by(1, &actor).await.unwrap());

        repo.record(&actor, TARGET_MESSAGE, first, ActionType::Delete)
            .await
            .unwrap();
        assert!(!repo.conversation_fully_deleted_by(1, &actor).await.unwrap());

        repo.record_for_all_messages(&actor, 1, ActionType::Delete)
            .await
            .unwrap();
        assert!(repo.conversation_fully_deleted_by(1, &actor).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_conversation_counts_as_fully_deleted() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ActionRepository::new(pool);

        let fully = repo
            .conversation_fully_deleted_by(99, &ActorRef::user(1))
            .await
            .unwrap();
        assert!(fully);
    }
}
