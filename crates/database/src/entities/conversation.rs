//! Conversation entity definitions

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub public_id: String,
    pub conversation_type: ConversationType,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    pub fn is_private(&self) -> bool {
        self.conversation_type == ConversationType::Private
    }

    pub fn is_group(&self) -> bool {
        self.conversation_type == ConversationType::Group
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ConversationType {
    Private,
    Group,
}

impl ConversationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationType::Private => "private",
            ConversationType::Group => "group",
        }
    }
}

impl From<&str> for ConversationType {
    fn from(s: &str) -> Self {
        match s {
            "group" => ConversationType::Group,
            _ => ConversationType::Private,
        }
    }
}

impl ToString for ConversationType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}

/// List entry for an actor's conversation overview: the conversation plus
/// the viewer's unread count and the latest visible message time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    pub unread_count: i64,
    pub last_message_at: Option<String>,
}
