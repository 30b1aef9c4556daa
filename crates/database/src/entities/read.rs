//! Read cursor entity definitions

use super::actor::ActorRef;
use serde::{Deserialize, Serialize};

/// One read cursor per (conversation, actor); upserted on every mark-read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Read {
    pub id: i64,
    pub conversation_id: i64,
    pub actor: ActorRef,
    pub read_at: String,
}
