//! Polymorphic actor resolution.
//!
//! The engine persists `(kind, id)` references only; turning a
//! reference into display data is delegated to resolvers registered by
//! the embedding application, one per actor kind.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use confab_database::{ActorProfile, ActorRef};

type Resolver = Box<dyn Fn(i64) -> Option<ActorProfile> + Send + Sync>;

/// Registry mapping actor kinds to profile resolvers
#[derive(Default)]
pub struct ActorRegistry {
    resolvers: RwLock<HashMap<String, Resolver>>,
}

impl ActorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the resolver for an actor kind, replacing any previous one
    pub fn register<F>(&self, kind: impl Into<String>, resolver: F)
    where
        F: Fn(i64) -> Option<ActorProfile> + Send + Sync + 'static,
    {
        let mut guard = self
            .resolvers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.insert(kind.into(), Box::new(resolver));
    }

    /// Resolve an actor reference to a profile. `None` when the kind has
    /// no registered resolver or the resolver does not know the id.
    pub fn resolve(&self, actor: &ActorRef) -> Option<ActorProfile> {
        let guard = self
            .resolvers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        guard.get(&actor.kind).and_then(|resolver| resolver(actor.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_registered_kinds_only() {
        let registry = ActorRegistry::new();
        registry.register("user", |id| {
            (id == 1).then(|| ActorProfile::new("Alice"))
        });

        let profile = registry.resolve(&ActorRef::user(1)).unwrap();
        assert_eq!(profile.display_name, "Alice");

        assert!(registry.resolve(&ActorRef::user(2)).is_none());
        assert!(registry.resolve(&ActorRef::new("bot", 1)).is_none());
    }

    #[test]
    fn later_registration_replaces_earlier() {
        let registry = ActorRegistry::new();
        registry.register("user", |_| Some(ActorProfile::new("old")));
        registry.register("user", |_| Some(ActorProfile::new("new")));

        let profile = registry.resolve(&ActorRef::user(9)).unwrap();
        assert_eq!(profile.display_name, "new");
    }
}
