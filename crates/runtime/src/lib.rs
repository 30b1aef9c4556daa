use std::sync::Arc;

use anyhow::Result;
use confab_config::AppConfig;
use confab_conversations::ConversationEngine;
use confab_database::initialize_database;
use redis::aio::ConnectionManager;
use sqlx::SqlitePool;
use tracing::info;

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::INFO)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct EngineServices {
    pub db_pool: SqlitePool,
    pub redis_conn: Option<ConnectionManager>,
    pub engine: Arc<ConversationEngine>,
}

impl EngineServices {
    /// Initialise the database, the optional Redis mirror, and the
    /// assembled engine from one loaded configuration.
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database).await?;

        // A missing or unreachable Redis never blocks startup; the hub
        // simply runs without the cross-process mirror.
        let redis_conn = match &config.broadcast.redis_url {
            Some(url) => match connect_redis(url).await {
                Ok(conn) => {
                    info!(url = %url, "redis connection established");
                    Some(conn)
                }
                Err(error) => {
                    tracing::warn!(%error, "failed to connect to redis, proceeding without mirror");
                    None
                }
            },
            None => None,
        };

        let engine = Arc::new(ConversationEngine::new(
            db_pool.clone(),
            config.clone(),
            redis_conn.clone(),
        ));
        info!("conversation engine ready");

        Ok(Self {
            db_pool,
            redis_conn,
            engine,
        })
    }
}

async fn connect_redis(url: &str) -> Result<ConnectionManager> {
    let client = redis::Client::open(url)?;
    Ok(ConnectionManager::new(client).await?)
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
