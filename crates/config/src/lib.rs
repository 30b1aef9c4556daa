use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "confab.toml",
    "config/confab.toml",
    "crates/config/confab.toml",
    "../confab.toml",
    "../config/confab.toml",
    "../crates/config/confab.toml",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub attachments: AttachmentConfig,
    pub rate_limit: RateLimitConfig,
    pub pagination: PaginationConfig,
    pub broadcast: BroadcastConfig,
    pub messaging: MessagingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            attachments: AttachmentConfig::default(),
            rate_limit: RateLimitConfig::default(),
            pagination: PaginationConfig::default(),
            broadcast: BroadcastConfig::default(),
            messaging: MessagingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://confab.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Limits and locations for attachment uploads.
///
/// ```
/// use confab_config::AttachmentConfig;
///
/// let attachments = AttachmentConfig::default();
/// assert_eq!(attachments.folder, "attachments");
/// assert_eq!(attachments.max_uploads, 10);
/// assert!(attachments.media_mime_types.contains(&"image/png".to_string()));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentConfig {
    pub storage_root: String,
    pub folder: String,
    pub public_base_url: String,
    pub media_mime_types: Vec<String>,
    pub file_mime_types: Vec<String>,
    pub max_media_size_bytes: u64,
    pub max_file_size_bytes: u64,
    pub max_uploads: u32,
}

impl AttachmentConfig {
    fn default_media_mime_types() -> Vec<String> {
        [
            "image/jpeg",
            "image/png",
            "image/gif",
            "image/webp",
            "video/mp4",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_file_mime_types() -> Vec<String> {
        ["application/pdf", "text/plain", "application/zip"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    const fn default_max_size() -> u64 {
        12 * 1024 * 1024
    }
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self {
            storage_root: "storage/attachments".to_string(),
            folder: "attachments".to_string(),
            public_base_url: "http://localhost".to_string(),
            media_mime_types: Self::default_media_mime_types(),
            file_mime_types: Self::default_file_mime_types(),
            max_media_size_bytes: Self::default_max_size(),
            max_file_size_bytes: Self::default_max_size(),
            max_uploads: 10,
        }
    }
}

/// Fixed-window throttle applied to message sends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub window_seconds: u64,
    pub max_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_attempts: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub page_step: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { page_step: 10 }
    }
}

/// Fan-out channel naming plus the optional Redis mirror.
///
/// ```
/// use confab_config::BroadcastConfig;
///
/// let broadcast = BroadcastConfig::default();
/// assert_eq!(broadcast.channel_prefix, "conversation");
/// assert!(broadcast.redis_url.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastConfig {
    pub channel_prefix: String,
    #[serde(default)]
    pub redis_url: Option<String>,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            channel_prefix: "conversation".to_string(),
            redis_url: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagingConfig {
    pub like_body: String,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            like_body: "\u{2764}\u{fe0f}".to_string(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use confab_config::load;
///
/// std::env::remove_var("CONFAB_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.database.url.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let db_max = i64::from(defaults.database.max_connections);
    let busy_timeout = i64::from(defaults.database.busy_timeout_ms);
    let max_media = i64::try_from(defaults.attachments.max_media_size_bytes).unwrap_or(i64::MAX);
    let max_file = i64::try_from(defaults.attachments.max_file_size_bytes).unwrap_or(i64::MAX);
    let window = i64::try_from(defaults.rate_limit.window_seconds).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder();
    builder = builder
        .set_default("database.url", defaults.database.url.clone())
        .unwrap()
        .set_default("database.max_connections", db_max)
        .unwrap()
        .set_default("database.busy_timeout_ms", busy_timeout)
        .unwrap()
        .set_default(
            "attachments.storage_root",
            defaults.attachments.storage_root.clone(),
        )
        .unwrap()
        .set_default("attachments.folder", defaults.attachments.folder.clone())
        .unwrap()
        .set_default(
            "attachments.public_base_url",
            defaults.attachments.public_base_url.clone(),
        )
        .unwrap()
        .set_default(
            "attachments.media_mime_types",
            defaults.attachments.media_mime_types.clone(),
        )
        .unwrap()
        .set_default(
            "attachments.file_mime_types",
            defaults.attachments.file_mime_types.clone(),
        )
        .unwrap()
        .set_default("attachments.max_media_size_bytes", max_media)
        .unwrap()
        .set_default("attachments.max_file_size_bytes", max_file)
        .unwrap()
        .set_default(
            "attachments.max_uploads",
            i64::from(defaults.attachments.max_uploads),
        )
        .unwrap()
        .set_default("rate_limit.window_seconds", window)
        .unwrap()
        .set_default(
            "rate_limit.max_attempts",
            i64::from(defaults.rate_limit.max_attempts),
        )
        .unwrap()
        .set_default(
            "pagination.page_step",
            i64::from(defaults.pagination.page_step),
        )
        .unwrap()
        .set_default(
            "broadcast.channel_prefix",
            defaults.broadcast.channel_prefix.clone(),
        )
        .unwrap()
        .set_default("messaging.like_body", defaults.messaging.like_body.clone())
        .unwrap();

    let environment_overrides = config::Environment::with_prefix("CONFAB").separator("__");

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("CONFAB_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via CONFAB_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(environment_overrides);

    let cfg = builder.build().context("unable to build configuration")?;

    let mut config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    if config.attachments.max_media_size_bytes > i64::MAX as u64 {
        config.attachments.max_media_size_bytes = i64::MAX as u64;
    }
    if config.attachments.max_file_size_bytes > i64::MAX as u64 {
        config.attachments.max_file_size_bytes = i64::MAX as u64;
    }

    debug!(?config, "loaded engine configuration");
    Ok(config)
}
