//! Message entity definitions

use super::actor::ActorRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub public_id: String,
    pub conversation_id: i64,
    pub sender: ActorRef,
    pub body: Option<String>,
    pub attachment_id: Option<i64>,
    pub reply_id: Option<i64>,
    pub deleted_at: Option<String>,
    pub created_at: String,
}

impl Message {
    /// Tombstoned messages survive only as reply targets.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_attachment(&self) -> bool {
        self.attachment_id.is_some()
    }

    pub fn owned_by(&self, actor: &ActorRef) -> bool {
        self.sender == *actor
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    pub conversation_id: i64,
    pub sender: ActorRef,
    pub body: Option<String>,
    pub reply_id: Option<i64>,
}

/// A page entry: the message plus its eagerly loaded reply target, if any.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageWithReply {
    pub message: Message,
    pub reply_to: Option<Message>,
}

/// Result of a windowed page load, oldest message first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<MessageWithReply>,
    pub total: i64,
    pub can_load_more: bool,
}
