//! Per-actor read cursors and unread counts.

use confab_database::{ActorRef, ReadRepository};
use sqlx::SqlitePool;

use crate::types::errors::ConversationResult;

/// Service for read cursor operations.
///
/// Unread computation runs without any conversation lock; a race with a
/// concurrent send only produces a transiently stale count.
pub struct ReadTracker {
    reads: ReadRepository,
}

impl ReadTracker {
    /// Create a new read tracker instance
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            reads: ReadRepository::new(pool),
        }
    }

    /// Advance the actor's cursor to now. A missing actor (no session)
    /// is a silent no-op, never an error.
    pub async fn mark_read(
        &self,
        conversation_id: i64,
        actor: Option<&ActorRef>,
    ) -> ConversationResult<()> {
        let Some(actor) = actor else {
            return Ok(());
        };

        self.reads.upsert(conversation_id, actor).await?;
        Ok(())
    }

    /// Messages from other actors created after the actor's cursor; all
    /// of them when the actor has never marked the conversation read.
    pub async fn unread_count(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> ConversationResult<i64> {
        Ok(self.reads.unread_count(conversation_id, actor).await?)
    }

    /// Whether the actor has nothing unread in the conversation
    pub async fn is_fully_read(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> ConversationResult<bool> {
        Ok(self.unread_count(conversation_id, actor).await? == 0)
    }
}
