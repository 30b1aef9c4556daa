//! Domain entities for the conversation engine
//!
//! Plain data structs mapped to and from SQLite rows by the repositories.

pub mod action;
pub mod actor;
pub mod attachment;
pub mod conversation;
pub mod group;
pub mod message;
pub mod participant;
pub mod read;

// Re-export all entity types
pub use action::{Action, ActionType, TARGET_CONVERSATION, TARGET_MESSAGE};
pub use actor::{ActorProfile, ActorRef};
pub use attachment::{Attachment, CreateAttachmentRequest};
pub use conversation::{Conversation, ConversationSummary, ConversationType};
pub use group::{CreateGroupRequest, Group, UpdateGroupRequest};
pub use message::{CreateMessageRequest, Message, MessagePage, MessageWithReply};
pub use participant::{CreateParticipantRequest, Participant, ParticipantRole};
pub use read::Read;
