//! Repository for participant data access operations.

use crate::entities::{ActorRef, CreateParticipantRequest, Participant, ParticipantRole};
use crate::types::{StoreError, StoreResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::info;

/// Repository for participant database operations
pub struct ParticipantRepository {
    pool: SqlitePool,
}

impl ParticipantRepository {
    /// Create a new participant repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn map_row(row: &SqliteRow) -> StoreResult<Participant> {
        let actor_kind: String = row
            .try_get("actor_kind")
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let actor_id: i64 = row
            .try_get("actor_id")
            .map_err(|e| StoreError::Database(e.to_string()))?;
        let role: String = row
            .try_get("role")
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Participant {
            id: row
                .try_get("id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            conversation_id: row
                .try_get("conversation_id")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            actor: ActorRef::new(actor_kind, actor_id),
            role: ParticipantRole::from(role.as_str()),
            exited_at: row
                .try_get("exited_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
            created_at: row
                .try_get("created_at")
                .map_err(|e| StoreError::Database(e.to_string()))?,
        })
    }

    /// Insert a membership row
    pub async fn add(&self, request: &CreateParticipantRequest) -> StoreResult<Participant> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "INSERT INTO participants (conversation_id, actor_kind, actor_id, role, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(request.conversation_id)
        .bind(&request.actor.kind)
        .bind(request.actor.id)
        .bind(request.role.to_string())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let participant_id = result.last_insert_rowid();

        info!(
            participant_id = participant_id,
            conversation_id = request.conversation_id,
            actor = %request.actor,
            role = request.role.as_str(),
            "added participant"
        );

        Ok(Participant {
            id: participant_id,
            conversation_id: request.conversation_id,
            actor: request.actor.clone(),
            role: request.role,
            exited_at: None,
            created_at: now,
        })
    }

    /// Find any membership row for an actor, exited rows included
    pub async fn find_for_actor(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> StoreResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT id, conversation_id, actor_kind, actor_id, role, exited_at, created_at
             FROM participants
             WHERE conversation_id = ? AND actor_kind = ? AND actor_id = ?
             ORDER BY id ASC LIMIT 1",
        )
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Find the actor's active membership row
    pub async fn find_active_for_actor(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> StoreResult<Option<Participant>> {
        let row = sqlx::query(
            "SELECT id, conversation_id, actor_kind, actor_id, role, exited_at, created_at
             FROM participants
             WHERE conversation_id = ? AND actor_kind = ? AND actor_id = ? AND exited_at IS NULL
             ORDER BY id ASC LIMIT 1",
        )
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.as_ref().map(Self::map_row).transpose()
    }

    /// Revive an exited membership: clear the exit stamp and reset the role
    pub async fn revive(&self, participant_id: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE participants SET exited_at = NULL, role = ? WHERE id = ?",
        )
        .bind(ParticipantRole::Participant.to_string())
        .bind(participant_id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::ParticipantNotFound);
        }

        info!(participant_id = participant_id, "revived participant");

        Ok(())
    }

    /// Stamp the active membership as exited. Returns `false` when no
    /// active row existed.
    pub async fn exit(&self, conversation_id: i64, actor: &ActorRef) -> StoreResult<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            "UPDATE participants SET exited_at = ?
             WHERE conversation_id = ? AND actor_kind = ? AND actor_id = ? AND exited_at IS NULL",
        )
        .bind(&now)
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        let exited = result.rows_affected() > 0;

        if exited {
            info!(
                conversation_id = conversation_id,
                actor = %actor,
                "participant exited conversation"
            );
        }

        Ok(exited)
    }

    /// Check for an active membership
    pub async fn belongs(&self, conversation_id: i64, actor: &ActorRef) -> StoreResult<bool> {
        let row = sqlx::query(
            "SELECT EXISTS (
                 SELECT 1 FROM participants
                 WHERE conversation_id = ? AND actor_kind = ? AND actor_id = ? AND exited_at IS NULL
             ) as present",
        )
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.try_get("present")
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// All active memberships for a conversation, insertion order
    pub async fn active_for_conversation(
        &self,
        conversation_id: i64,
    ) -> StoreResult<Vec<Participant>> {
        let rows = sqlx::query(
            "SELECT id, conversation_id, actor_kind, actor_id, role, exited_at, created_at
             FROM participants
             WHERE conversation_id = ? AND exited_at IS NULL
             ORDER BY id ASC",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        rows.iter().map(Self::map_row).collect()
    }

    /// Count active memberships
    pub async fn active_count(&self, conversation_id: i64) -> StoreResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM participants
             WHERE conversation_id = ? AND exited_at IS NULL",
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        row.try_get("count")
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Count all membership rows, exited ones included
    pub async fn total_count(&self, conversation_id: i64) -> StoreResult<i64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM participants WHERE conversation_id = ?")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        row.try_get("count")
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    /// Count membership rows held by one actor. A self-conversation holds
    /// two rows for the same actor.
    pub async fn count_for_actor(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> StoreResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) as count FROM participants
             WHERE conversation_id = ? AND actor_kind = ? AND actor_id = ?",
        )
        .bind(conversation_id)
        .bind(&actor.kind)
        .bind(actor.id)
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
        let db_path = temp_dir.path().join("test_participants.db");
        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePool::connect(&db_url).await.unwrap();

        sqlx::query(
            "CREATE TABLE participants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER NOT NULL,
                actor_kind TEXT NOT NULL,
                actor_id INTEGER NOT NULL,
                role TEXT NOT NULL DEFAULT 'participant',
                exited_at TEXT,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        (pool, temp_dir)
    }

    fn request(conversation_id: i64, actor: ActorRef) -> CreateParticipantRequest {
        CreateParticipantRequest {
            conversation_id,
            actor,
            role: ParticipantRole::Participant,
        }
    }

    #[tokio::test]
    async fn test_add_and_belongs() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ParticipantRepository::new(pool);
        let actor = ActorRef::user(1);

        let participant = repo.add(&request(1, actor.clone())).await.unwrap();
        assert!(participant.id > 0);
        assert!(participant.is_active());

        assert!(repo.belongs(1, &actor).await.unwrap());
        assert!(!repo.belongs(1, &ActorRef::user(2)).await.unwrap());
        assert!(!repo.belongs(2, &actor).await.unwrap());
    }

    #[tokio::test]
    async fn test_exit_and_revive() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ParticipantRepository::new(pool);
        let actor = ActorRef::user(1);

        let participant = repo.add(&request(1, actor.clone())).await.unwrap();

        assert!(repo.exit(1, &actor).await.unwrap());
        assert!(!repo.belongs(1, &actor).await.unwrap());

        // Exiting again is a no-op.
        assert!(!repo.exit(1, &actor).await.unwrap());

        let found = repo.find_for_actor(1, &actor).await.unwrap().unwrap();
        assert!(found.exited_at.is_some());
        assert!(repo.find_active_for_actor(1, &actor).await.unwrap().is_none());

        repo.revive(participant.id).await.unwrap();
        assert!(repo.belongs(1, &actor).await.unwrap());

        let revived = repo.find_for_actor(1, &actor).await.unwrap().unwrap();
        assert!(revived.exited_at.is_none());
        assert_eq!(revived.role, ParticipantRole::Participant);
    }

    #[tokio::test]
    async fn test_counts_distinguish_active_and_total() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ParticipantRepository::new(pool);
        let alice = ActorRef::user(1);
        let bob = ActorRef::user(2);

        repo.add(&request(1, alice.clone())).await.unwrap();
        repo.add(&request(1, bob.clone())).await.unwrap();

        assert_eq!(repo.active_count(1).await.unwrap(), 2);
        assert_eq!(repo.total_count(1).await.unwrap(), 2);

        repo.exit(1, &bob).await.unwrap();
        assert_eq!(repo.active_count(1).await.unwrap(), 1);
        assert_eq!(repo.total_count(1).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_self_conversation_rows_count_per_actor() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ParticipantRepository::new(pool);
        let actor = ActorRef::user(1);

        repo.add(&request(1, actor.clone())).await.unwrap();
        repo.add(&request(1, actor.clone())).await.unwrap();

        assert_eq!(repo.total_count(1).await.unwrap(), 2);
        assert_eq!(repo.count_for_actor(1, &actor).await.unwrap(), 2);
        assert_eq!(repo.count_for_actor(1, &ActorRef::user(2)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_active_for_conversation_orders_by_insertion() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ParticipantRepository::new(pool);

        repo.add(&request(1, ActorRef::user(1))).await.unwrap();
        repo.add(&request(1, ActorRef::new("bot", 9))).await.unwrap();

        let active = repo.active_for_conversation(1).await.unwrap();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].actor, ActorRef::user(1));
        assert_eq!(active[1].actor, ActorRef::new("bot", 9));
    }
}
