//! Participant registry: membership of actors in conversations.

use confab_database::{
    ActorRef, Conversation, CreateParticipantRequest, Participant, ParticipantRepository,
    ParticipantRole,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::services::locks::ConversationLocks;
use crate::types::errors::{ConversationError, ConversationResult};

/// Active participants a private conversation can hold
const PRIVATE_CAPACITY: i64 = 2;

/// Service for conversation membership operations
pub struct ParticipantService {
    participants: ParticipantRepository,
    locks: ConversationLocks,
}

impl ParticipantService {
    /// Create a new participant service instance
    pub fn new(pool: SqlitePool, locks: ConversationLocks) -> Self {
        Self {
            participants: ParticipantRepository::new(pool),
            locks,
        }
    }

    /// Add an actor to a conversation.
    ///
    /// Fails with `AlreadyParticipant` when an active membership exists
    /// and with `CapacityExceeded` when a private conversation already
    /// holds two active members. A previously exited membership is
    /// revived instead of inserted again, so re-joining clears the exit.
    pub async fn add_participant(
        &self,
        conversation: &Conversation,
        actor: &ActorRef,
    ) -> ConversationResult<Participant> {
        let _guard = self.locks.acquire(conversation.id).await;

        if self
            .participants
            .find_active_for_actor(conversation.id, actor)
            .await?
            .is_some()
        {
            return Err(ConversationError::AlreadyParticipant {
                conversation_id: conversation.id,
            });
        }

        if conversation.is_private()
            && self.participants.active_count(conversation.id).await? >= PRIVATE_CAPACITY
        {
            return Err(ConversationError::CapacityExceeded {
                conversation_id: conversation.id,
            });
        }

        if let Some(exited) = self
            .participants
            .find_for_actor(conversation.id, actor)
            .await?
        {
            self.participants.revive(exited.id).await?;
            info!(
                conversation_id = conversation.id,
                actor = %actor,
                "revived exited membership"
            );
            return Ok(Participant {
                role: ParticipantRole::Participant,
                exited_at: None,
                ..exited
            });
        }

        let participant = self
            .participants
            .add(&CreateParticipantRequest {
                conversation_id: conversation.id,
                actor: actor.clone(),
                role: ParticipantRole::Participant,
            })
            .await?;

        Ok(participant)
    }

    /// Whether the actor holds an active membership
    pub async fn belongs_to(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> ConversationResult<bool> {
        Ok(self.participants.belongs(conversation_id, actor).await?)
    }

    /// Resolve the other party of a private conversation.
    ///
    /// Defined only for private conversations with exactly two active
    /// members: returns the member that is not the viewer, or the viewer
    /// itself for a self-conversation. Any other shape resolves to `None`.
    pub async fn receiver(
        &self,
        conversation: &Conversation,
        viewer: &ActorRef,
    ) -> ConversationResult<Option<ActorRef>> {
        if !conversation.is_private() {
            return Ok(None);
        }

        let active = self
            .participants
            .active_for_conversation(conversation.id)
            .await?;
        if active.len() != PRIVATE_CAPACITY as usize {
            return Ok(None);
        }

        let other = active
            .iter()
            .map(|participant| participant.actor.clone())
            .find(|actor| actor != viewer);

        Ok(Some(other.unwrap_or_else(|| viewer.clone())))
    }

    /// Whether the conversation is the actor's notes-to-self: private,
    /// two participant rows in total, both referencing the actor.
    pub async fn is_self_conversation(
        &self,
        conversation: &Conversation,
        actor: &ActorRef,
    ) -> ConversationResult<bool> {
        if !conversation.is_private() {
            return Ok(false);
        }

        let total = self.participants.total_count(conversation.id).await?;
        if total != PRIVATE_CAPACITY {
            return Ok(false);
        }

        let own = self
            .participants
            .count_for_actor(conversation.id, actor)
            .await?;
        Ok(own == PRIVATE_CAPACITY)
    }

    /// Stamp the actor's active membership as exited. Silent no-op when
    /// no active membership exists.
    pub async fn exit_conversation(
        &self,
        conversation_id: i64,
        actor: &ActorRef,
    ) -> ConversationResult<()> {
        self.participants.exit(conversation_id, actor).await?;
        Ok(())
    }

    /// All active memberships for a conversation, insertion order
    pub async fn active_participants(
        &self,
        conversation_id: i64,
    ) -> ConversationResult<Vec<Participant>> {
        Ok(self
            .participants
            .active_for_conversation(conversation_id)
            .await?)
    }
}
