//! Shared types for the conversation domain layer

pub mod errors;
pub mod events;

pub use errors::{ConversationError, ConversationResult};
pub use events::ConversationEvent;
