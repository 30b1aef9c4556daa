//! Confab Conversations Crate
//!
//! The domain layer of the Confab conversation engine: participant
//! membership, read cursors, the per-actor action ledger, message
//! creation and asymmetric deletion, conversation lifecycle with
//! cross-party deletion reconciliation, and real-time fan-out of new
//! messages to open conversation views.

pub mod broadcast;
pub mod collaborators;
pub mod engine;
pub mod services;
pub mod types;
pub mod views;

pub use broadcast::MessageHub;
pub use collaborators::{
    ActorRegistry, AttachmentStore, FixedWindowLimiter, FsAttachmentStore, RateLimiter,
    StoredFile, Upload, UploadValidator,
};
pub use engine::ConversationEngine;
pub use services::{
    ActionLedger, ConversationLocks, ConversationService, MessageService, ParticipantService,
    ReadTracker, VisibilityFilter,
};
pub use types::{
    errors::{ConversationError, ConversationResult},
    events::ConversationEvent,
};
pub use views::ConversationView;
