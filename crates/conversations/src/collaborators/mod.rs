//! Collaborator ports consumed by the engine: actor resolution,
//! attachment storage, and rate limiting. Each is an interface the
//! embedding application can replace; the provided implementations are
//! the in-process defaults.

pub mod actors;
pub mod attachments;
pub mod rate_limit;

pub use actors::ActorRegistry;
pub use attachments::{
    AttachmentStore, FsAttachmentStore, StoredFile, Upload, UploadValidator,
};
pub use rate_limit::{FixedWindowLimiter, RateLimiter};
