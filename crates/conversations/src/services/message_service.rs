//! Message creation, pagination, and asymmetric deletion.
//!
//! "Delete for me" records a ledger action and changes nothing shared;
//! "delete for everyone" removes the row itself, tombstoning it when
//! other messages still reply to it.

use std::sync::Arc;
use std::time::Duration;

use confab_config::{AttachmentConfig, RateLimitConfig};
use confab_database::{
    ActorRef, Conversation, CreateAttachmentRequest, CreateMessageRequest, Message, MessagePage,
    MessageRepository, ParticipantRepository,
};
use sqlx::SqlitePool;
use tracing::info;

use crate::broadcast::MessageHub;
use crate::collaborators::attachments::{AttachmentStore, Upload, UploadValidator};
use crate::collaborators::rate_limit::RateLimiter;
use crate::services::action_ledger::ActionLedger;
use crate::services::locks::ConversationLocks;
use crate::types::errors::{ConversationError, ConversationResult};
use crate::types::events::ConversationEvent;

/// Service for message operations
pub struct MessageService {
    messages: MessageRepository,
    participants: ParticipantRepository,
    ledger: ActionLedger,
    hub: MessageHub,
    store: Arc<dyn AttachmentStore>,
    limiter: Arc<dyn RateLimiter>,
    locks: ConversationLocks,
    attachments: AttachmentConfig,
    rate_limit: RateLimitConfig,
}

impl MessageService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: SqlitePool,
        hub: MessageHub,
        store: Arc<dyn AttachmentStore>,
        limiter: Arc<dyn RateLimiter>,
        locks: ConversationLocks,
        attachments: AttachmentConfig,
        rate_limit: RateLimitConfig,
    ) -> Self {
        Self {
            messages: MessageRepository::new(pool.clone()),
            participants: ParticipantRepository::new(pool.clone()),
            ledger: ActionLedger::new(pool),
            hub,
            store,
            limiter,
            locks,
            attachments,
            rate_limit,
        }
    }

    /// Create a message in the conversation and broadcast its creation.
    ///
    /// Checks run in a fixed order: authentication, throttle, content,
    /// membership, then the optional reply target. The throttle counts
    /// the attempt even when a later check rejects it.
    pub async fn create(
        &self,
        conversation: &Conversation,
        sender: Option<&ActorRef>,
        body: Option<&str>,
        upload: Option<&Upload>,
        reply_to: Option<i64>,
    ) -> ConversationResult<Message> {
        let sender = sender.ok_or(ConversationError::Unauthenticated)?;

        let key = format!("send-message:{sender}");
        let window = Duration::from_secs(self.rate_limit.window_seconds);
        if !self
            .limiter
            .allow(&key, window, self.rate_limit.max_attempts)
        {
            return Err(ConversationError::rate_limited(key));
        }

        let body = body.map(str::trim).filter(|b| !b.is_empty());
        if body.is_none() && upload.is_none() {
            return Err(ConversationError::EmptyMessage);
        }

        if !self.participants.belongs(conversation.id, sender).await? {
            return Err(ConversationError::not_a_participant(conversation.id));
        }

        if let Some(reply_id) = reply_to {
            let target = self
                .messages
                .find_by_id(reply_id)
                .await?
                .ok_or_else(|| ConversationError::message_not_found(reply_id))?;
            if target.conversation_id != conversation.id {
                return Err(ConversationError::validation(
                    "Reply target belongs to a different conversation",
                ));
            }
        }

        let attachment = match upload {
            Some(upload) => Some(self.store_upload(upload).await?),
            None => None,
        };

        let message = {
            let _guard = self.locks.acquire(conversation.id).await;
            self.messages
                .create(
                    &CreateMessageRequest {
                        conversation_id: conversation.id,
                        sender: sender.clone(),
                        body: body.map(str::to_string),
                        reply_id: reply_to,
                    },
                    attachment.as_ref(),
                )
                .await?
        };

        info!(
            conversation_id = conversation.id,
            message_id = message.id,
            sender = %sender,
            has_attachment = message.has_attachment(),
            "created message"
        );

        self.hub
            .publish(&ConversationEvent::message_created(&message))
            .await?;

        Ok(message)
    }

    async fn store_upload(&self, upload: &Upload) -> ConversationResult<CreateAttachmentRequest> {
        UploadValidator::validate(upload, &self.attachments)?;

        let stored = self
            .store
            .store(
                upload.bytes.clone(),
                &self.attachments.folder,
                &upload.original_name,
            )
            .await?;

        Ok(CreateAttachmentRequest {
            url: format!(
                "{}/{}",
                self.attachments.public_base_url.trim_end_matches('/'),
                stored.file_path
            ),
            file_path: stored.file_path,
            file_name: stored.file_name,
            original_name: upload.original_name.clone(),
            mime_type: upload.mime_type.clone(),
        })
    }

    /// Hide a message from the actor's own view by recording a ledger
    /// action. The row is untouched and nothing is broadcast; repeating
    /// the call is a no-op.
    pub async fn delete_for_me(
        &self,
        message_id: i64,
        actor: Option<&ActorRef>,
    ) -> ConversationResult<()> {
        let actor = actor.ok_or(ConversationError::Unauthenticated)?;
        let message = self.find(message_id).await?;

        if !self
            .participants
            .belongs(message.conversation_id, actor)
            .await?
        {
            return Err(ConversationError::not_a_participant(
                message.conversation_id,
            ));
        }

        self.ledger.record_message_delete(actor, message.id).await?;
        Ok(())
    }

    /// Remove a message for every participant. Only the sender may do
    /// this. The row is tombstoned while active messages still reply to
    /// it, otherwise deleted outright along with its attachment; either
    /// way a deletion event is broadcast.
    pub async fn delete_for_everyone(
        &self,
        message_id: i64,
        actor: Option<&ActorRef>,
    ) -> ConversationResult<()> {
        let actor = actor.ok_or(ConversationError::Unauthenticated)?;
        let message = self.find(message_id).await?;

        if !message.owned_by(actor) {
            return Err(ConversationError::not_owner(message.id));
        }
        if !self
            .participants
            .belongs(message.conversation_id, actor)
            .await?
        {
            return Err(ConversationError::not_a_participant(
                message.conversation_id,
            ));
        }

        let tombstoned = {
            let _guard = self.locks.acquire(message.conversation_id).await;
            if self.messages.has_active_reply(message.id).await? {
                self.messages.tombstone(message.id).await?;
                true
            } else {
                self.messages.force_delete(message.id).await?;
                false
            }
        };

        info!(
            conversation_id = message.conversation_id,
            message_id = message.id,
            tombstoned,
            "deleted message for everyone"
        );

        self.hub
            .publish(&ConversationEvent::message_deleted(
                message.conversation_id,
                message.id,
            ))
            .await?;

        Ok(())
    }

    /// Load the newest window of messages visible to the viewer, oldest
    /// first. `page_size` counts from the end of the conversation, so
    /// growing it walks the window backwards through history.
    pub async fn load_page(
        &self,
        conversation_id: i64,
        viewer: Option<&ActorRef>,
        page_size: i64,
    ) -> ConversationResult<MessagePage> {
        let total = self.messages.count_visible(conversation_id, viewer).await?;
        let offset = (total - page_size).max(0);

        let messages = self
            .messages
            .page(conversation_id, viewer, page_size, offset)
            .await?;

        Ok(MessagePage {
            can_load_more: total > messages.len() as i64,
            total,
            messages,
        })
    }

    /// Fetch a message by id
    pub async fn find(&self, message_id: i64) -> ConversationResult<Message> {
        self.messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| ConversationError::message_not_found(message_id))
    }

    /// Fetch a message by its public id
    pub async fn find_by_public_id(&self, public_id: &str) -> ConversationResult<Message> {
        self.messages
            .find_by_public_id(public_id)
            .await?
            .ok_or_else(|| ConversationError::message_not_found(public_id))
    }
}
