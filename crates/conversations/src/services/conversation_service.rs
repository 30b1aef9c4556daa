//! Conversation lifecycle: creation, listing, per-actor clearing, and
//! cross-party deletion reconciliation.

use std::sync::Arc;

use confab_database::{
    ActorRef, Conversation, ConversationRepository, ConversationSummary, CreateGroupRequest,
    Group, GroupRepository, UpdateGroupRequest,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::broadcast::MessageHub;
use crate::services::action_ledger::ActionLedger;
use crate::services::locks::ConversationLocks;
use crate::services::participant_service::ParticipantService;
use crate::types::errors::{ConversationError, ConversationResult};

/// Which conversations an overview listing includes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibilityFilter {
    /// Every conversation the actor actively belongs to
    All,
    /// Drop conversations the actor has cleared from their own view
    ExcludeCleared,
}

/// Service for conversation lifecycle operations
pub struct ConversationService {
    conversations: ConversationRepository,
    groups: GroupRepository,
    participants: Arc<ParticipantService>,
    ledger: ActionLedger,
    hub: MessageHub,
    locks: ConversationLocks,
}

impl ConversationService {
    pub fn new(
        pool: SqlitePool,
        participants: Arc<ParticipantService>,
        hub: MessageHub,
        locks: ConversationLocks,
    ) -> Self {
        Self {
            conversations: ConversationRepository::new(pool.clone()),
            groups: GroupRepository::new(pool.clone()),
            participants,
            ledger: ActionLedger::new(pool),
            hub,
            locks,
        }
    }

    /// Create a private conversation between two actors. The same actor
    /// on both sides yields a notes-to-self conversation with two
    /// membership rows.
    pub async fn create_private(
        &self,
        a: &ActorRef,
        b: &ActorRef,
    ) -> ConversationResult<Conversation> {
        Ok(self.conversations.create_private(a, b).await?)
    }

    /// Create a group conversation. The creator becomes the owner and
    /// every listed member an ordinary participant.
    pub async fn create_group(
        &self,
        creator: &ActorRef,
        members: &[ActorRef],
        request: &CreateGroupRequest,
    ) -> ConversationResult<Conversation> {
        if request.name.trim().is_empty() {
            return Err(ConversationError::validation("Group name cannot be empty"));
        }

        Ok(self
            .conversations
            .create_group(creator, members, request)
            .await?)
    }

    /// Fetch a conversation by id
    pub async fn find(&self, conversation_id: i64) -> ConversationResult<Conversation> {
        self.conversations
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| ConversationError::conversation_not_found(conversation_id))
    }

    /// Fetch a conversation by its public id
    pub async fn find_by_public_id(&self, public_id: &str) -> ConversationResult<Conversation> {
        self.conversations
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ConversationError::conversation_not_found(public_id))
    }

    /// Clear the conversation from the actor's view and reconcile
    /// cross-party deletion. Returns whether the conversation was
    /// destroyed for everyone.
    ///
    /// Clearing records a delete action against every message,
    /// tombstoned ones included. A group conversation then stops there;
    /// so does a private one whose other party cannot be resolved. A
    /// self-conversation is destroyed outright, and a two-party private
    /// conversation is destroyed once both parties have cleared every
    /// message, which holds vacuously when it never had any.
    pub async fn delete_for(
        &self,
        conversation: &Conversation,
        actor: Option<&ActorRef>,
    ) -> ConversationResult<bool> {
        let actor = actor.ok_or(ConversationError::Unauthenticated)?;
        let _guard = self.locks.acquire(conversation.id).await;

        if !self.participants.belongs_to(conversation.id, actor).await? {
            return Err(ConversationError::not_a_participant(conversation.id));
        }

        let cleared = self
            .ledger
            .clear_conversation_for(actor, conversation.id)
            .await?;
        info!(
            conversation_id = conversation.id,
            actor = %actor,
            cleared,
            "cleared conversation for actor"
        );

        if conversation.is_group() {
            return Ok(false);
        }

        if self
            .participants
            .is_self_conversation(conversation, actor)
            .await?
        {
            self.destroy_locked(conversation.id).await?;
            return Ok(true);
        }

        let Some(other) = self.participants.receiver(conversation, actor).await? else {
            return Ok(false);
        };

        if self.ledger.has_been_deleted_by(conversation.id, actor).await?
            && self
                .ledger
                .has_been_deleted_by(conversation.id, &other)
                .await?
        {
            self.destroy_locked(conversation.id).await?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Destroy a conversation for everyone: messages, attachments,
    /// participants, reads, ledger rows, and group settings all go in
    /// one cascade, and the broadcast channel is closed.
    pub async fn destroy(&self, conversation_id: i64) -> ConversationResult<()> {
        let _guard = self.locks.acquire(conversation_id).await;
        self.destroy_locked(conversation_id).await
    }

    async fn destroy_locked(&self, conversation_id: i64) -> ConversationResult<()> {
        self.conversations.destroy(conversation_id).await?;
        self.hub.close(conversation_id).await;
        Ok(())
    }

    /// The actor's conversation overview, most recently active first
    pub async fn list_for_actor(
        &self,
        actor: &ActorRef,
        filter: VisibilityFilter,
    ) -> ConversationResult<Vec<ConversationSummary>> {
        Ok(self
            .conversations
            .list_for_actor(actor, filter == VisibilityFilter::ExcludeCleared)
            .await?)
    }

    /// Settings row for a group conversation, if it is one
    pub async fn group_settings(&self, conversation_id: i64) -> ConversationResult<Option<Group>> {
        Ok(self.groups.find_by_conversation(conversation_id).await?)
    }

    /// Update a group's display settings. Only an active participant may
    /// change them.
    pub async fn update_group_settings(
        &self,
        conversation: &Conversation,
        actor: &ActorRef,
        request: &UpdateGroupRequest,
    ) -> ConversationResult<Group> {
        if !self.participants.belongs_to(conversation.id, actor).await? {
            return Err(ConversationError::not_a_participant(conversation.id));
        }

        Ok(self.groups.update(conversation.id, request).await?)
    }
}
