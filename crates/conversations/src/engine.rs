//! The assembled conversation engine.
//!
//! One `ConversationEngine` wires the domain services over a shared
//! pool, lock table, and broadcast hub. Embedding applications construct
//! it once at startup and open [`crate::views::ConversationView`]s
//! against it per actor and conversation.

use std::sync::Arc;

use confab_config::AppConfig;
use redis::aio::ConnectionManager;
use sqlx::SqlitePool;

use crate::broadcast::MessageHub;
use crate::collaborators::actors::ActorRegistry;
use crate::collaborators::attachments::{AttachmentStore, FsAttachmentStore};
use crate::collaborators::rate_limit::{FixedWindowLimiter, RateLimiter};
use crate::services::action_ledger::ActionLedger;
use crate::services::conversation_service::ConversationService;
use crate::services::locks::ConversationLocks;
use crate::services::message_service::MessageService;
use crate::services::participant_service::ParticipantService;
use crate::services::read_tracker::ReadTracker;

pub struct ConversationEngine {
    config: AppConfig,
    hub: MessageHub,
    actors: ActorRegistry,
    participants: Arc<ParticipantService>,
    reads: ReadTracker,
    ledger: ActionLedger,
    messages: MessageService,
    conversations: ConversationService,
}

impl ConversationEngine {
    /// Assemble the engine with the default filesystem attachment store
    /// and in-process rate limiter
    pub fn new(pool: SqlitePool, config: AppConfig, redis: Option<ConnectionManager>) -> Self {
        let store = Arc::new(FsAttachmentStore::new(config.attachments.storage_root.clone()));
        let limiter = Arc::new(FixedWindowLimiter::new());
        Self::with_collaborators(pool, config, redis, store, limiter)
    }

    /// Assemble the engine around caller-supplied collaborator ports
    pub fn with_collaborators(
        pool: SqlitePool,
        config: AppConfig,
        redis: Option<ConnectionManager>,
        store: Arc<dyn AttachmentStore>,
        limiter: Arc<dyn RateLimiter>,
    ) -> Self {
        let locks = ConversationLocks::default();
        let hub = MessageHub::new(config.broadcast.channel_prefix.clone(), redis);

        let participants = Arc::new(ParticipantService::new(pool.clone(), locks.clone()));
        let reads = ReadTracker::new(pool.clone());
        let ledger = ActionLedger::new(pool.clone());
        let messages = MessageService::new(
            pool.clone(),
            hub.clone(),
            store,
            limiter,
            locks.clone(),
            config.attachments.clone(),
            config.rate_limit.clone(),
        );
        let conversations =
            ConversationService::new(pool, Arc::clone(&participants), hub.clone(), locks);

        Self {
            config,
            hub,
            actors: ActorRegistry::new(),
            participants,
            reads,
            ledger,
            messages,
            conversations,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn hub(&self) -> &MessageHub {
        &self.hub
    }

    pub fn actors(&self) -> &ActorRegistry {
        &self.actors
    }

    pub fn participants(&self) -> &ParticipantService {
        &self.participants
    }

    pub fn reads(&self) -> &ReadTracker {
        &self.reads
    }

    pub fn ledger(&self) -> &ActionLedger {
        &self.ledger
    }

    pub fn messages(&self) -> &MessageService {
        &self.messages
    }

    pub fn conversations(&self) -> &ConversationService {
        &self.conversations
    }
}
