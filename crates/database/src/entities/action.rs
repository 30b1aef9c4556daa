//! Action ledger entity definitions

use super::actor::ActorRef;
use serde::{Deserialize, Serialize};

/// Target kind for actions recorded against messages.
pub const TARGET_MESSAGE: &str = "message";

/// Target kind for actions recorded against conversations.
pub const TARGET_CONVERSATION: &str = "conversation";

/// Append-only record of an actor acting on a target. The union of
/// `delete` actions is the sole source of truth for per-actor visibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: i64,
    pub actor: ActorRef,
    pub target_kind: String,
    pub target_id: i64,
    pub action_type: ActionType,
    pub created_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActionType {
    Delete,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Delete => "delete",
        }
    }
}

impl From<&str> for ActionType {
    fn from(s: &str) -> Self {
        match s {
            "delete" => ActionType::Delete,
            _ => ActionType::Delete,
        }
    }
}

impl ToString for ActionType {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
