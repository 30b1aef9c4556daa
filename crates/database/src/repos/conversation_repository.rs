//! Repository for conversation data access operations.

use crate::entities::{
    ActorRef, Conversation, ConversationSummary, ConversationType, CreateGroupRequest,
    ParticipantRole,
};
use crate::types::{StoreError, StoreResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for conversation database operations
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    /// Create a new conversation repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> StoreResult<Conversation> {
        let conversation_type: String = row
            .try_get("conversation_type")
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Conversation {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            public_id: row
                .try_get("public_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            conversation_type: ConversationType::from(conversation_type.as_str()),
            created_at: row
                .try_get("created_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            updated_at: row
                .try_get("updated_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
        })
    }

    /// Create a private conversation seeded with exactly two participants.
    /// The two actors may be the same, which creates a self-conversation
    /// holding two rows for that actor.
    pub async fn create_private(&self, a: &ActorRef, b: &ActorRef) -> StoreResult<Conversation> {
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO conversations (public_id, conversation_type, created_at, updated_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(ConversationType::Private.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let conversation_id = result.last_insert_rowid();

        for actor in [a, b] {
            sqlx::query(
                "INSERT INTO participants (conversation_id, actor_kind, actor_id, role, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(conversation_id)
            .bind(&actor.kind)
            .bind(actor.id)
            .bind(ParticipantRole::Participant.to_string())
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(
            conversation_id = conversation_id,
            public_id = %public_id,
            a = %a,
            b = %b,
            "created private conversation"
        );

        Ok(Conversation {
            id: conversation_id,
            public_id,
            conversation_type: ConversationType::Private,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Create a group conversation: settings row, the creator as owner,
    /// and one participant row per member.
    pub async fn create_group(
        &self,
        creator: &ActorRef,
        members: &[ActorRef],
        request: &CreateGroupRequest,
    ) -> StoreResult<Conversation> {
        let public_id = cuid2::cuid();
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let result = sqlx::query(
            "INSERT INTO conversations (public_id, conversation_type, created_at, updated_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(ConversationType::Group.to_string())
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let conversation_id = result.last_insert_rowid();

        sqlx::query(
            "INSERT INTO groups (conversation_id, name, description, avatar_url, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(&request.avatar_url)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query(
            "INSERT INTO participants (conversation_id, actor_kind, actor_id, role, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(conversation_id)
        .bind(&creator.kind)
        .bind(creator.id)
        .bind(ParticipantRole::Owner.to_string())
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        for member in members {
            sqlx::query(
                "INSERT INTO participants (conversation_id, actor_kind, actor_id, role, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(conversation_id)
            .bind(&member.kind)
            .bind(member.id)
            .bind(ParticipantRole::Participant.to_string())
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(
            conversation_id = conversation_id,
            public_id = %public_id,
            creator = %creator,
            members = members.len(),
            name = %request.name,
            "created group conversation"
        );

        Ok(Conversation {
            id: conversation_id,
            public_id,
            conversation_type: ConversationType::Group,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Find a conversation by its ID
    pub async fn find_by_id(&self, id: i64) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, public_id, conversation_type, created_at, updated_at
             FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Find a conversation by its public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> StoreResult<Option<Conversation>> {
        let row = sqlx::query(
            "SELECT id, public_id, conversation_type, created_at, updated_at
             FROM conversations WHERE public_id = ?",
        )
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Physically remove a conversation and everything attached to it, in
    /// one transaction and fixed order: participants, reads, messages with
    /// their attachments, ledger actions, group settings, then the
    /// conversation row itself.
    pub async fn destroy(&self, conversation_id: i64) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = sqlx::query("SELECT id, attachment_id FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut message_ids = Vec::new();
        let mut attachment_ids = Vec::new();
        for row in &rows {
            let message_id: i64 = row
                .try_get("id")
                .map_err(|e| StoreError::Database(e.to_string()))?;
            message_ids.push(message_id);

            let attachment_id: Option<i64> = row
                .try_get("attachment_id")
                .map_err(|e| StoreError::Database(e.to_string()))?;
            if let Some(attachment_id) = attachment_id {
                attachment_ids.push(attachment_id);
            }
        }

        sqlx::query("DELETE FROM participants WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM reads WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM messages WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for attachment_id in &attachment_ids {
            sqlx::query("DELETE FROM attachments WHERE id = ?")
                .bind(attachment_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        sqlx::query("DELETE FROM actions WHERE target_kind = 'conversation' AND target_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for message_id in &message_ids {
            sqlx::query("DELETE FROM actions WHERE target_kind = 'message' AND target_id = ?")
                .bind(message_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Database(e.to_string()))?;
        }

        sqlx::query("DELETE FROM groups WHERE conversation_id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        sqlx::query("DELETE FROM conversations WHERE id = ?")
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        info!(
            conversation_id = conversation_id,
            removed_messages = message_ids.len(),
            removed_attachments = attachment_ids.len(),
            "destroyed conversation"
        );

        Ok(())
    }

    /// Conversations the actor actively belongs to, most recently active
    /// first, each with the actor's unread count and the latest visible
    /// message time. With `exclude_cleared` set, conversations whose every
    /// message carries the actor's delete action are dropped.
    pub async fn list_for_actor(
        &self,
        actor: &ActorRef,
        exclude_cleared: bool,
    ) -> StoreResult<Vec<ConversationSummary>> {
        let base = "SELECT c.id, c.public_id, c.conversation_type, c.created_at, c.updated_at,
               (SELECT MAX(m.created_at) FROM messages m
                  WHERE m.conversation_id = c.id AND m.deleted_at IS NULL) as last_message_at,
               (SELECT COUNT(*) FROM messages m
                  WHERE m.conversation_id = c.id
                    AND m.deleted_at IS NULL
                    AND NOT (m.sender_kind = ? AND m.sender_id = ?)
                    AND m.created_at > COALESCE((SELECT r.read_at FROM reads r
                         WHERE r.conversation_id = c.id AND r.actor_kind = ? AND r.actor_id = ?), '')) as unread_count
         FROM conversations c
         JOIN participants p ON p.conversation_id = c.id
         WHERE p.actor_kind = ? AND p.actor_id = ? AND p.exited_at IS NULL";

        let cleared_filter = " AND EXISTS (SELECT 1 FROM messages m
                  WHERE m.conversation_id = c.id AND m.deleted_at IS NULL
                    AND NOT EXISTS (SELECT 1 FROM actions a
                         WHERE a.target_kind = 'message' AND a.target_id = m.id
                           AND a.actor_kind = ? AND a.actor_id = ? AND a.action_type = 'delete'))";

        let tail = " GROUP BY c.id ORDER BY c.updated_at DESC";

        let query = if exclude_cleared {
            format!("{base}{cleared_filter}{tail}")
        } else {
            format!("{base}{tail}")
        };

        let mut query_builder = sqlx::query(&query)
            .bind(&actor.kind)
            .bind(actor.id)
            .bind(&actor.kind)
            .bind(actor.id)
            .bind(&actor.kind)
            .bind(actor.id);

        if exclude_cleared {
            query_builder = query_builder.bind(&actor.kind).bind(actor.id);
        }

        let rows = query_builder
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let summaries = rows
            .iter()
            .map(|row| {
                Ok(ConversationSummary {
                    conversation: Self::map_row(row)?,
                    unread_count: row
                        .try_get("unread_count")
                        .map_err(|e| StoreError::Database(e.to_string()))?,
                    last_message_at: row
                        .try_get("last_message_at")
                        .map_err(|e| StoreError::Database(e.to_string()))?,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::SqlitePool;
    use tempfile::TempDir;

    async fn create_test_pool() -> (SqlitePool, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test_conversations.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePool::connect(&db_url).await.unwrap();

        for statement in [
            "CREATE TABLE conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                public_id TEXT NOT NULL UNIQUE,
                conversation_type TEXT NOT NULL DEFAULT 'private',
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE TABLE participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                actor_kind TEXT NOT NULL,
                actor_id INTEGER NOT NULL,
                role TEXT NOT NULL DEFAULT 'participant',
                exited_at TEXT,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                public_id TEXT NOT NULL UNIQUE,
                conversation_id INTEGER NOT NULL,
                sender_kind TEXT NOT NULL,
                sender_id INTEGER NOT NULL,
                body TEXT,
                attachment_id INTEGER,
                reply_id INTEGER,
                deleted_at TEXT,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE attachments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                file_path TEXT NOT NULL,
                file_name TEXT NOT NULL,
                original_name TEXT NOT NULL,
                mime_type TEXT NOT NULL,
                url TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            "CREATE TABLE reads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                actor_kind TEXT NOT NULL,
                actor_id INTEGER NOT NULL,
                read_at TEXT NOT NULL,
                UNIQUE (conversation_id, actor_kind, actor_id)
            )",
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
            "CREATE TABLE groups (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT,
                avatar_url TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        ] {
            sqlx::query(statement).execute(&pool).await.unwrap();
        }

        (pool, temp_dir)
    }

    async fn insert_message(
        pool: &SqlitePool,
        conversation_id: i64,
        sender: &ActorRef,
        attachment_id: Option<i64>,
    ) -> i64 {
        let result = sqlx::query(
            "INSERT INTO messages (public_id, conversation_id, sender_kind, sender_id, body, attachment_id, created_at)
             VALUES (?, ?, ?, ?, 'hello', ?, ?)",
        )
        .bind(cuid2::cuid())
        .bind(conversation_id)
        .bind(&sender.kind)
        .bind(sender.id)
        .bind(attachment_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(pool)
        .await
        .unwrap();
        result.last_insert_rowid()
    }

    async fn count_rows(pool: &SqlitePool, table: &str) -> i64 {
        let row = sqlx::query(&format!("SELECT COUNT(*) as count FROM {table}"))
            .fetch_one(pool)
            .await
            .unwrap();
        row.try_get("count").unwrap()
    }

    #[tokio::test]
    async fn test_create_private_seeds_two_participants() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());

        let conversation = repo
            .create_private(&ActorRef::user(1), &ActorRef::user(2))
            .await
            .unwrap();
        assert!(conversation.is_private());
        assert!(!conversation.public_id.is_empty());

        assert_eq!(count_rows(&pool, "participants").await, 2);

        let found = repo.find_by_id(conversation.id).await.unwrap().unwrap();
        assert_eq!(found, conversation);

        let by_public = repo
            .find_by_public_id(&conversation.public_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_public.id, conversation.id);
    }

    #[tokio::test]
    async fn test_create_private_with_same_actor_twice() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());

        let actor = ActorRef::user(1);
        repo.create_private(&actor, &actor).await.unwrap();

        // Self-conversations keep both rows.
        assert_eq!(count_rows(&pool, "participants").await, 2);
    }

    #[tokio::test]
    async fn test_create_group_writes_settings_and_roles() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());

        let request = CreateGroupRequest {
            name: "Trip".to_string(),
            description: None,
            avatar_url: None,
        };

        let conversation = repo
            .create_group(
                &ActorRef::user(1),
                &[ActorRef::user(2), ActorRef::user(3)],
                &request,
            )
            .await
            .unwrap();
        assert!(conversation.is_group());

        assert_eq!(count_rows(&pool, "participants").await, 3);
        assert_eq!(count_rows(&pool, "groups").await, 1);

        let owner_row = sqlx::query(
            "SELECT role FROM participants WHERE conversation_id = ? AND actor_id = 1",
        )
        .bind(conversation.id)
        .fetch_one(&pool)
        .await
        .unwrap();
        let role: String = owner_row.try_get("role").unwrap();
        assert_eq!(role, "owner");
    }

    #[tokio::test]
    async fn test_destroy_removes_every_related_row() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());
        let alice = ActorRef::user(1);
        let bob = ActorRef::user(2);

        let conversation = repo.create_private(&alice, &bob).await.unwrap();

        let attachment = sqlx::query(
            "INSERT INTO attachments (file_path, file_name, original_name, mime_type, url, created_at)
             VALUES ('attachments/x.png', 'x.png', 'x.png', 'image/png', 'http://localhost/x.png', ?)",
        )
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap()
        .last_insert_rowid();

        let message_id =
            insert_message(&pool, conversation.id, &alice, Some(attachment)).await;
        insert_message(&pool, conversation.id, &bob, None).await;

        sqlx::query(
            "INSERT INTO reads (conversation_id, actor_kind, actor_id, read_at) VALUES (?, 'user', 1, ?)",
        )
        .bind(conversation.id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query(
            "INSERT INTO actions (actor_kind, actor_id, target_kind, target_id, action_type, created_at)
             VALUES ('user', 2, 'message', ?, 'delete', ?)",
        )
        .bind(message_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();

        repo.destroy(conversation.id).await.unwrap();

        assert_eq!(count_rows(&pool, "conversations").await, 0);
        assert_eq!(count_rows(&pool, "participants").await, 0);
        assert_eq!(count_rows(&pool, "messages").await, 0);
        assert_eq!(count_rows(&pool, "attachments").await, 0);
        assert_eq!(count_rows(&pool, "reads").await, 0);
        assert_eq!(count_rows(&pool, "actions").await, 0);
    }

    #[tokio::test]
    async fn test_list_for_actor_orders_by_activity() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());
        let alice = ActorRef::user(1);
        let bob = ActorRef::user(2);
        let carol = ActorRef::user(3);

        let older = repo.create_private(&alice, &bob).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let newer = repo.create_private(&alice, &carol).await.unwrap();

        insert_message(&pool, older.id, &bob, None).await;

        let list = repo.list_for_actor(&alice, false).await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].conversation.id, newer.id);
        assert_eq!(list[1].conversation.id, older.id);

        assert_eq!(list[1].unread_count, 1);
        assert!(list[1].last_message_at.is_some());
        assert_eq!(list[0].unread_count, 0);
        assert!(list[0].last_message_at.is_none());

        // Carol only belongs to the newer conversation.
        let carol_list = repo.list_for_actor(&carol, false).await.unwrap();
        assert_eq!(carol_list.len(), 1);
    }

    #[tokio::test]
    async fn test_list_for_actor_can_exclude_cleared() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());
        let alice = ActorRef::user(1);
        let bob = ActorRef::user(2);

        let conversation = repo.create_private(&alice, &bob).await.unwrap();
        let message_id = insert_message(&pool, conversation.id, &bob, None).await;

        assert_eq!(repo.list_for_actor(&alice, true).await.unwrap().len(), 1);

        sqlx::query(
            "INSERT INTO actions (actor_kind, actor_id, target_kind, target_id, action_type, created_at)
             VALUES ('user', 1, 'message', ?, 'delete', ?)",
        )
        .bind(message_id)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&pool)
        .await
        .unwrap();

        // Every message is now cleared for Alice; the conversation drops out
        // of the filtered list but stays in the full one.
        assert_eq!(repo.list_for_actor(&alice, true).await.unwrap().len(), 0);
        assert_eq!(repo.list_for_actor(&alice, false).await.unwrap().len(), 1);
        assert_eq!(repo.list_for_actor(&bob, true).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_self_conversation_listed_once() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ConversationRepository::new(pool.clone());
        let actor = ActorRef::user(1);

        repo.create_private(&actor, &actor).await.unwrap();

        // Two participant rows must not produce a duplicate entry.
        let list = repo.list_for_actor(&actor, false).await.unwrap();
        assert_eq!(list.len(), 1);
    }
}
