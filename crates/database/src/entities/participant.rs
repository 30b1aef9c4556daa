//! Participant entity definitions

use super::actor::ActorRef;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: i64,
    pub conversation_id: i64,
    pub actor: ActorRef,
    pub role: ParticipantRole,
    pub exited_at: Option<String>,
    pub created_at: String,
}

impl Participant {
    /// A membership counts only while the actor has not exited.
    pub fn is_active(&self) -> bool {
        self.exited_at.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateParticipantRequest {
    pub conversation_id: i64,
    pub actor: ActorRef,
    pub role: ParticipantRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParticipantRole {
    Owner,
    Admin,
    Participant,
}

impl ParticipantRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParticipantRole::Owner => "owner",
            ParticipantRole::Admin => "admin",
            ParticipantRole::Participant => "participant",
        }
    }
}

impl From<&str> for ParticipantRole {
    fn from(s: &str) -> Self {
        match s {
            "owner" => ParticipantRole::Owner,
            "admin" => ParticipantRole::Admin,
            _ => ParticipantRole::Participant,
        }
    }
}

impl ToString for ParticipantRole {
    fn to_string(&self) -> String {
        self.as_str().to_string()
    }
}
