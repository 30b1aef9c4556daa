//! Confab Database Crate
//!
//! This crate provides storage for the Confab conversation engine,
//! including connection management, migrations, and repository
//! implementations for conversations, participants, messages,
//! attachments, read cursors, and the per-actor action ledger.

use confab_config::DatabaseConfig;
use sqlx::SqlitePool;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::prepare_database;
pub use migrations::run_migrations;

// Re-export repositories
pub use repos::{
    ActionRepository, AttachmentRepository, ConversationRepository, GroupRepository,
    MessageRepository, ParticipantRepository, ReadRepository,
};

// Re-export entities
pub use entities::{
    action::{Action, ActionType, TARGET_CONVERSATION, TARGET_MESSAGE},
    actor::{ActorProfile, ActorRef},
    attachment::{Attachment, CreateAttachmentRequest},
    conversation::{Conversation, ConversationSummary, ConversationType},
    group::{CreateGroupRequest, Group, UpdateGroupRequest},
    message::{CreateMessageRequest, Message, MessagePage, MessageWithReply},
    participant::{CreateParticipantRequest, Participant, ParticipantRole},
    read::Read,
};

// Re-export types
pub use types::{
    errors::{DatabaseError, StoreError},
    DatabaseResult, StoreResult,
};

/// Re-export commonly used types for convenience
pub use sqlx::Pool;

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
