//! Append-only ledger of per-actor actions.
//!
//! The recorded union of (actor, message, delete) rows is the sole
//! source of truth for per-actor visibility; no hidden row-level flag
//! participates in the decision.

use confab_database::{ActionRepository, ActionType, ActorRef, TARGET_MESSAGE};
use sqlx::SqlitePool;

use crate::types::errors::ConversationResult;

/// Service over the action ledger
pub struct ActionLedger {
    actions: ActionRepository,
}

impl ActionLedger {
    /// Create a new action ledger instance
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            actions: ActionRepository::new(pool),
        }
    }

    /// Record a delete action against a message. Recording twice is
    /// harmless; returns whether a new row was written.
    pub async fn record_message_delete(
        &self,
        actor: &ActorRef,
        message_id: i64,
    ) -> ConversationResult<bool> {
        Ok(self
            .actions
            .record(actor, TARGET_MESSAGE, message_id, ActionType::Delete)
            .await?)
    }

    /// Whether the actor has hidden the message from their own view
    pub async fn has_message_delete(
        &self,
        actor: &ActorRef,
        message_id: i64,
    ) -> ConversationResult<bool> {
        Ok(self.actions.has_message_delete(actor, message_id).await?)
    }

    /// Record a delete action for every message of the conversation,
    /// tombstoned ones included. Returns the number of new rows.
    pub async fn clear_conversation_for(
        &self,
        actor: &ActorRef,
        conversation_id: i64,
    ) -> ConversationResult<u64> {
        Ok(self
            .actions
            .record_for_all_messages(actor, conversation_id, ActionType::Delete)
            .await?)
    }

    /// Whether every message of the conversation carries the actor's
    /// delete action. Vacuously true for an empty conversation.
    pub async fn has_been_deleted_by(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> ConversationResult<bool> {
        Ok(self
            .actions
            .conversation_fully_deleted_by(conversation_id, actor)
            .await?)
    }

    /// Whether every listed participant has recorded a delete action
    /// against the message
    pub async fn all_participants_deleted(
        &self,
        message_id: i64,
        participants: &[ActorRef],
    ) -> ConversationResult<bool> {
        for participant in participants {
            if !self.has_message_delete(participant, message_id).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
