//! Event types for real-time conversation updates.
//!
//! Payloads carry ids rather than message bodies; receiving views
//! re-fetch the message on receipt, so the wire format stays stable
//! while the message shape evolves.

use confab_database::{ActorRef, Message};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event published on a conversation's broadcast topic
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ConversationEvent {
    /// A message was created in the conversation
    MessageCreated {
        event_id: String,
        conversation_id: i64,
        message_id: i64,
        sender: ActorRef,
    },

    /// A message was deleted for everyone
    MessageDeleted {
        event_id: String,
        conversation_id: i64,
        message_id: i64,
    },
}

impl ConversationEvent {
    /// Build the creation event for a freshly persisted message
    pub fn message_created(message: &Message) -> Self {
        Self::MessageCreated {
            event_id: Uuid::new_v4().to_string(),
            conversation_id: message.conversation_id,
            message_id: message.id,
            sender: message.sender.clone(),
        }
    }

    /// Build the deletion event for a message removed for everyone
    pub fn message_deleted(conversation_id: i64, message_id: i64) -> Self {
        Self::MessageDeleted {
            event_id: Uuid::new_v4().to_string(),
            conversation_id,
            message_id,
        }
    }

    /// The conversation the event belongs to
    pub fn conversation_id(&self) -> i64 {
        match self {
            Self::MessageCreated {
                conversation_id, ..
            }
            | Self::MessageDeleted {
                conversation_id, ..
            } => *conversation_id,
        }
    }

    /// The message the event refers to
    pub fn message_id(&self) -> i64 {
        match self {
            Self::MessageCreated { message_id, .. } | Self::MessageDeleted { message_id, .. } => {
                *message_id
            }
        }
    }

    /// Get event type name for logging
    pub fn event_type_name(&self) -> &'static str {
        match self {
            Self::MessageCreated { .. } => "message_created",
            Self::MessageDeleted { .. } => "message_deleted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_message() -> Message {
        Message {
            id: 42,
            public_id: "msg-public".to_string(),
            conversation_id: 7,
            sender: ActorRef::user(3),
            body: Some("hello".to_string()),
            attachment_id: None,
            reply_id: None,
            deleted_at: None,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn created_event_carries_ids_not_bodies() {
        let event = ConversationEvent::message_created(&sample_message());
        assert_eq!(event.conversation_id(), 7);
        assert_eq!(event.message_id(), 42);
        assert_eq!(event.event_type_name(), "message_created");

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"MessageCreated\""));
        assert!(!json.contains("hello"));
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = ConversationEvent::message_deleted(7, 42);
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ConversationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.conversation_id(), 7);
        assert_eq!(parsed.message_id(), 42);
    }

    #[test]
    fn event_ids_are_unique() {
        let message = sample_message();
        let a = ConversationEvent::message_created(&message);
        let b = ConversationEvent::message_created(&message);
        let id = |event: &ConversationEvent| match event {
            ConversationEvent::MessageCreated { event_id, .. }
            | ConversationEvent::MessageDeleted { event_id, .. } => event_id.clone(),
        };
        assert_ne!(id(&a), id(&b));
    }
}
