//! Error types for the conversation domain layer.

use confab_database::StoreError;
use thiserror::Error;

/// Result type alias for conversation operations
pub type ConversationResult<T> = Result<T, ConversationError>;

/// Main error type for the conversation engine.
///
/// Authorization variants are always checked against the resource's own
/// stored relations (a message's conversation, a conversation's
/// participant rows), never against caller-supplied identifiers.
/// Broadcast unavailability is deliberately absent: the hub logs and
/// swallows publish failures instead of surfacing them on the write path.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("No acting actor supplied")]
    Unauthenticated,

    #[error("Actor is not an active participant of conversation {conversation_id}")]
    NotAParticipant { conversation_id: i64 },

    #[error("Actor does not own message {message_id}")]
    NotOwner { message_id: i64 },

    #[error("Actor is already an active participant of conversation {conversation_id}")]
    AlreadyParticipant { conversation_id: i64 },

    #[error("Private conversation {conversation_id} already has two active participants")]
    CapacityExceeded { conversation_id: i64 },

    #[error("A message needs a body or an attachment")]
    EmptyMessage,

    #[error("Rate limit exceeded for {key}")]
    RateLimited { key: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Conversation not found: {id}")]
    ConversationNotFound { id: String },

    #[error("Message not found: {id}")]
    MessageNotFound { id: String },

    #[error("Attachment storage error: {message}")]
    Storage { message: String },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ConversationError {
    /// Create a membership error for a conversation
    pub fn not_a_participant(conversation_id: i64) -> Self {
        Self::NotAParticipant { conversation_id }
    }

    /// Create an ownership error for a message
    pub fn not_owner(message_id: i64) -> Self {
        Self::NotOwner { message_id }
    }

    /// Create a rate limit error
    pub fn rate_limited(key: impl Into<String>) -> Self {
        Self::RateLimited { key: key.into() }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error for conversations
    pub fn conversation_not_found(id: impl ToString) -> Self {
        Self::ConversationNotFound { id: id.to_string() }
    }

    /// Create a not found error for messages
    pub fn message_not_found(id: impl ToString) -> Self {
        Self::MessageNotFound { id: id.to_string() }
    }

    /// Create an attachment storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for ConversationError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ConversationError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation {
            message: format!("JSON serialization error: {err}"),
        }
    }
}
