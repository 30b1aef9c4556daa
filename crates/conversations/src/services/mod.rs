//! Domain services for the conversation engine

pub mod action_ledger;
pub mod conversation_service;
pub mod locks;
pub mod message_service;
pub mod participant_service;
pub mod read_tracker;

pub use action_ledger::ActionLedger;
pub use conversation_service::{ConversationService, VisibilityFilter};
pub use locks::ConversationLocks;
pub use message_service::MessageService;
pub use participant_service::ParticipantService;
pub use read_tracker::ReadTracker;
