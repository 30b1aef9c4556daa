//! Database repository implementations

pub mod action_repository;
pub mod attachment_repository;
pub mod conversation_repository;
pub mod group_repository;
pub mod message_repository;
pub mod participant_repository;
pub mod read_repository;

// Re-export all repositories for convenience
pub use action_repository::*;
pub use attachment_repository::*;
pub use conversation_repository::*;
pub use group_repository::*;
pub use message_repository::*;
pub use participant_repository::*;
pub use read_repository::*;
