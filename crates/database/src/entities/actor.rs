//! Polymorphic actor references

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reference to an actor owned by the embedding application.
///
/// The engine stores `(kind, id)` pairs and never resolves them itself;
/// profile lookup is delegated to registered resolvers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorRef {
    pub kind: String,
    pub id: i64,
}

impl ActorRef {
    pub fn new(kind: impl Into<String>, id: i64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// Convenience constructor for the most common actor kind.
    pub fn user(id: i64) -> Self {
        Self::new("user", id)
    }
}

impl fmt::Display for ActorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// Display data returned by an actor resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActorProfile {
    pub display_name: String,
    pub avatar_url: Option<String>,
}

impl ActorProfile {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_refs_compare_by_kind_and_id() {
        assert_eq!(ActorRef::user(1), ActorRef::new("user", 1));
        assert_ne!(ActorRef::user(1), ActorRef::user(2));
        assert_ne!(ActorRef::user(1), ActorRef::new("bot", 1));
    }

    #[test]
    fn actor_ref_display_includes_kind() {
        assert_eq!(ActorRef::new("bot", 7).to_string(), "bot:7");
    }
}
