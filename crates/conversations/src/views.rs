//! Stateful per-actor conversation views.
//!
//! A `ConversationView` is what an open conversation screen holds: the
//! visible message window, the pending reply target, and a subscription
//! to the conversation's event stream. Event application is idempotent,
//! so replayed or duplicated events leave the view unchanged.

use std::sync::Arc;

use confab_database::{ActorRef, Conversation, Message, MessageWithReply};
use tokio::sync::broadcast;
use tracing::debug;

use crate::collaborators::attachments::{Upload, UploadValidator};
use crate::engine::ConversationEngine;
use crate::types::errors::{ConversationError, ConversationResult};
use crate::types::events::ConversationEvent;

pub struct ConversationView {
    engine: Arc<ConversationEngine>,
    actor: Option<ActorRef>,
    conversation: Conversation,
    receiver_actor: Option<ActorRef>,
    messages: Vec<MessageWithReply>,
    page_size: i64,
    can_load_more: bool,
    reply_to: Option<i64>,
    events: broadcast::Receiver<ConversationEvent>,
}

impl ConversationView {
    /// Open a view on a conversation.
    ///
    /// A known actor must be an active participant. The view loads the
    /// newest page, subscribes to the conversation's events, and marks
    /// the conversation read for the actor.
    pub async fn open(
        engine: Arc<ConversationEngine>,
        conversation_id: i64,
        actor: Option<ActorRef>,
    ) -> ConversationResult<Self> {
        let conversation = engine.conversations().find(conversation_id).await?;

        let mut receiver_actor = None;
        if let Some(actor) = &actor {
            if !engine.participants().belongs_to(conversation.id, actor).await? {
                return Err(ConversationError::not_a_participant(conversation.id));
            }
            receiver_actor = engine.participants().receiver(&conversation, actor).await?;
        }

        let events = engine.hub().subscribe(conversation.id).await;
        let page_size = i64::from(engine.config().pagination.page_step);
        let page = engine
            .messages()
            .load_page(conversation.id, actor.as_ref(), page_size)
            .await?;

        engine.reads().mark_read(conversation.id, actor.as_ref()).await?;

        Ok(Self {
            engine,
            actor,
            conversation,
            receiver_actor,
            messages: page.messages,
            page_size,
            can_load_more: page.can_load_more,
            reply_to: None,
            events,
        })
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn actor(&self) -> Option<&ActorRef> {
        self.actor.as_ref()
    }

    /// The other party of a private conversation, the viewer itself for
    /// notes-to-self, `None` for groups
    pub fn receiver(&self) -> Option<&ActorRef> {
        self.receiver_actor.as_ref()
    }

    /// The loaded window, oldest message first
    pub fn messages(&self) -> &[MessageWithReply] {
        &self.messages
    }

    pub fn can_load_more(&self) -> bool {
        self.can_load_more
    }

    pub fn reply_to(&self) -> Option<i64> {
        self.reply_to
    }

    /// Send a message, optionally with uploads. Each upload becomes its
    /// own attachment message and a non-empty body follows as a final
    /// text message; all of them carry the pending reply target, which
    /// is cleared afterwards. Sent messages are appended to the view
    /// immediately rather than waiting for the echo event.
    pub async fn send_message(
        &mut self,
        body: Option<&str>,
        uploads: &[Upload],
    ) -> ConversationResult<()> {
        UploadValidator::batch_size(uploads.len(), &self.engine.config().attachments)?;

        let sender = self.actor.clone();
        let reply_to = self.reply_to;

        for upload in uploads {
            let message = self
                .engine
                .messages()
                .create(
                    &self.conversation,
                    sender.as_ref(),
                    None,
                    Some(upload),
                    reply_to,
                )
                .await?;
            self.push_message(message).await?;
        }

        let body = body.map(str::trim).filter(|b| !b.is_empty());
        if body.is_some() || uploads.is_empty() {
            let message = self
                .engine
                .messages()
                .create(&self.conversation, sender.as_ref(), body, None, reply_to)
                .await?;
            self.push_message(message).await?;
        }

        self.reply_to = None;
        Ok(())
    }

    /// Send the configured like body as a plain message
    pub async fn send_like(&mut self) -> ConversationResult<()> {
        let like_body = self.engine.config().messaging.like_body.clone();
        self.send_message(Some(&like_body), &[]).await
    }

    /// Stage a reply target for the next send. The target must live in
    /// this conversation.
    pub async fn set_reply(&mut self, message_id: i64) -> ConversationResult<()> {
        let target = self.engine.messages().find(message_id).await?;
        if target.conversation_id != self.conversation.id {
            return Err(ConversationError::validation(
                "Reply target belongs to a different conversation",
            ));
        }
        self.reply_to = Some(message_id);
        Ok(())
    }

    pub fn remove_reply(&mut self) {
        self.reply_to = None;
    }

    /// Apply a broadcast event to the view. Returns whether the view
    /// changed; events for other conversations, echoes of the viewer's
    /// own sends, duplicates, and already-gone messages all apply as
    /// no-ops.
    pub async fn apply(&mut self, event: &ConversationEvent) -> ConversationResult<bool> {
        if event.conversation_id() != self.conversation.id {
            return Ok(false);
        }

        match event {
            ConversationEvent::MessageCreated {
                message_id, sender, ..
            } => {
                if self.actor.as_ref() == Some(sender) {
                    return Ok(false);
                }
                if self.contains(*message_id) {
                    return Ok(false);
                }

                let message = match self.engine.messages().find(*message_id).await {
                    Ok(message) => message,
                    Err(ConversationError::MessageNotFound { .. }) => return Ok(false),
                    Err(error) => return Err(error),
                };

                self.push_message(message).await?;
                self.engine
                    .reads()
                    .mark_read(self.conversation.id, self.actor.as_ref())
                    .await?;
                Ok(true)
            }

            ConversationEvent::MessageDeleted { message_id, .. } => {
                let before = self.messages.len();
                self.messages
                    .retain(|entry| entry.message.id != *message_id);
                if self.reply_to == Some(*message_id) {
                    self.reply_to = None;
                }
                Ok(self.messages.len() != before)
            }
        }
    }

    /// Grow the window by one page step and reload it
    pub async fn load_more(&mut self) -> ConversationResult<()> {
        self.page_size += i64::from(self.engine.config().pagination.page_step);
        self.refresh().await
    }

    /// Reload the current window from storage
    pub async fn refresh(&mut self) -> ConversationResult<()> {
        let page = self
            .engine
            .messages()
            .load_page(self.conversation.id, self.actor.as_ref(), self.page_size)
            .await?;
        self.messages = page.messages;
        self.can_load_more = page.can_load_more;
        Ok(())
    }

    /// Hide a message from this viewer only
    pub async fn delete_for_me(&mut self, message_id: i64) -> ConversationResult<()> {
        self.engine
            .messages()
            .delete_for_me(message_id, self.actor.as_ref())
            .await?;
        self.messages.retain(|entry| entry.message.id != message_id);
        Ok(())
    }

    /// Remove one of the viewer's own messages for every participant
    pub async fn delete_for_everyone(&mut self, message_id: i64) -> ConversationResult<()> {
        self.engine
            .messages()
            .delete_for_everyone(message_id, self.actor.as_ref())
            .await?;
        self.messages.retain(|entry| entry.message.id != message_id);
        if self.reply_to == Some(message_id) {
            self.reply_to = None;
        }
        Ok(())
    }

    /// Clear the conversation from the viewer's list, destroying it for
    /// everyone when cross-party reconciliation allows. Returns whether
    /// it was destroyed.
    pub async fn delete_conversation(&mut self) -> ConversationResult<bool> {
        let destroyed = self
            .engine
            .conversations()
            .delete_for(&self.conversation, self.actor.as_ref())
            .await?;
        self.messages.clear();
        self.reply_to = None;
        Ok(destroyed)
    }

    /// Wait for the next event on this conversation's stream. Lagged
    /// receivers skip ahead; `None` means the channel is closed, which
    /// happens when the conversation is destroyed.
    pub async fn next_event(&mut self) -> Option<ConversationEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(
                        conversation_id = self.conversation.id,
                        skipped, "event receiver lagged"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    fn contains(&self, message_id: i64) -> bool {
        self.messages
            .iter()
            .any(|entry| entry.message.id == message_id)
    }

    async fn push_message(&mut self, message: Message) -> ConversationResult<()> {
        if self.contains(message.id) {
            return Ok(());
        }

        let reply_to = match message.reply_id {
            Some(reply_id) => match self.engine.messages().find(reply_id).await {
                Ok(target) => Some(target),
                Err(ConversationError::MessageNotFound { .. }) => None,
                Err(error) => return Err(error),
            },
            None => None,
        };

        self.messages.push(MessageWithReply { message, reply_to });
        Ok(())
    }
}
