//! Real-time fan-out of conversation events.
//!
//! Each conversation gets a lazily created in-process broadcast channel;
//! views subscribe on open and drop their receiver on close. When a
//! Redis connection is configured, every event is mirrored to the
//! conversation's channel there so other processes can relay it. A
//! failed mirror publish is logged and swallowed, local delivery never
//! depends on Redis being up.

use std::collections::HashMap;
use std::sync::Arc;

use redis::aio::ConnectionManager;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::types::errors::ConversationResult;
use crate::types::events::ConversationEvent;

const CHANNEL_CAPACITY: usize = 256;

/// Per-conversation event hub
#[derive(Clone)]
pub struct MessageHub {
    channels: Arc<RwLock<HashMap<i64, broadcast::Sender<ConversationEvent>>>>,
    prefix: String,
    redis: Option<ConnectionManager>,
}

impl MessageHub {
    pub fn new(prefix: impl Into<String>, redis: Option<ConnectionManager>) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            prefix: prefix.into(),
            redis,
        }
    }

    /// Name of the conversation's channel, `<prefix>.<id>`
    pub fn topic(&self, conversation_id: i64) -> String {
        format!("{}.{conversation_id}", self.prefix)
    }

    /// Subscribe to a conversation's events, creating its channel on
    /// first use
    pub async fn subscribe(&self, conversation_id: i64) -> broadcast::Receiver<ConversationEvent> {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&conversation_id) {
                return sender.subscribe();
            }
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(conversation_id)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Publish an event to every subscriber of its conversation.
    ///
    /// A conversation with no local subscribers and no channel yet is
    /// skipped locally; the Redis mirror still receives the event.
    pub async fn publish(&self, event: &ConversationEvent) -> ConversationResult<()> {
        let conversation_id = event.conversation_id();

        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(&conversation_id) {
                // Send fails only when no receiver is alive; not an error.
                let delivered = sender.send(event.clone()).unwrap_or(0);
                debug!(
                    conversation_id,
                    event = event.event_type_name(),
                    subscribers = delivered,
                    "published conversation event"
                );
            }
        }

        if let Some(redis) = &self.redis {
            let payload = serde_json::to_string(event)?;
            let topic = self.topic(conversation_id);
            let mut connection = redis.clone();
            let result: Result<(), redis::RedisError> = redis::cmd("PUBLISH")
                .arg(&topic)
                .arg(&payload)
                .query_async(&mut connection)
                .await;
            if let Err(error) = result {
                warn!(topic, %error, "redis mirror publish failed");
            }
        }

        Ok(())
    }

    /// Drop a conversation's channel; active receivers observe `Closed`
    pub async fn close(&self, conversation_id: i64) {
        let mut channels = self.channels.write().await;
        channels.remove(&conversation_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confab_database::{ActorRef, Message};

    fn message(conversation_id: i64, id: i64) -> Message {
        Message {
            id,
            public_id: format!("msg-{id}"),
            conversation_id,
            sender: ActorRef::user(1),
            body: Some("hi".to_string()),
            attachment_id: None,
            reply_id: None,
            deleted_at: None,
            created_at: "2024-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[tokio::test]
    async fn subscribers_receive_events_for_their_conversation() {
        let hub = MessageHub::new("conversation", None);
        let mut receiver = hub.subscribe(7).await;

        let event = ConversationEvent::message_created(&message(7, 42));
        hub.publish(&event).await.unwrap();

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.message_id(), 42);
    }

    #[tokio::test]
    async fn conversations_do_not_cross_talk() {
        let hub = MessageHub::new("conversation", None);
        let mut on_seven = hub.subscribe(7).await;
        let _on_eight = hub.subscribe(8).await;

        hub.publish(&ConversationEvent::message_created(&message(8, 1)))
            .await
            .unwrap();

        assert!(matches!(
            on_seven.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_harmless() {
        let hub = MessageHub::new("conversation", None);
        hub.publish(&ConversationEvent::message_deleted(3, 9))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn close_disconnects_receivers() {
        let hub = MessageHub::new("conversation", None);
        let mut receiver = hub.subscribe(7).await;

        hub.close(7).await;
        assert!(matches!(
            receiver.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[test]
    fn topic_carries_the_prefix() {
        let hub = MessageHub::new("confab", None);
        assert_eq!(hub.topic(12), "confab.12");
    }
}
