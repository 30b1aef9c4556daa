//! Error types for the database layer

use thiserror::Error;

/// Connection and migration failures raised while bootstrapping.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    #[error("Database migration error: {0}")]
    MigrationError(String),
}

/// Errors raised by the repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Conversation not found")]
    ConversationNotFound,

    #[error("Message not found")]
    MessageNotFound,

    #[error("Participant not found")]
    ParticipantNotFound,

    #[error("Attachment not found")]
    AttachmentNotFound,

    #[error("Group not found")]
    GroupNotFound,

    #[error("Database error: {0}")]
    Database(String),
}
