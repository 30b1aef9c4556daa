//! Per-conversation write serialization.
//!
//! Each conversation is an independently lockable unit of work: message
//! writes, both deletion flavors, and the deletion-cascade decision hold
//! the conversation's mutex so two participants cannot race each other
//! into a missed cascade. Reads never take the lock.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Registry of lazily created per-conversation mutexes
#[derive(Clone, Default)]
pub struct ConversationLocks {
    inner: Arc<RwLock<HashMap<i64, Arc<Mutex<()>>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the write lock for a conversation, creating it on first use
    pub async fn acquire(&self, conversation_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let guard = self.inner.read().await;
            guard.get(&conversation_id).cloned()
        };

        let lock = match lock {
            Some(lock) => lock,
            None => {
                let mut guard = self.inner.write().await;
                guard
                    .entry(conversation_id)
                    .or_insert_with(|| Arc::new(Mutex::new(())))
                    .clone()
            }
        };

        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_conversation_serializes() {
        let locks = ConversationLocks::new();

        let held = locks.acquire(1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_conversations_do_not_block() {
        let locks = ConversationLocks::new();

        let _held = locks.acquire(1).await;
        let other = tokio::time::timeout(Duration::from_millis(50), locks.acquire(2)).await;
        assert!(other.is_ok());
    }
}
