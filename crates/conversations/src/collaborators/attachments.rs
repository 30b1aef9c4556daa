//! Attachment storage and upload validation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use confab_config::AttachmentConfig;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::types::errors::{ConversationError, ConversationResult};

/// An upload handed to the engine before any persistence
#[derive(Debug, Clone)]
pub struct Upload {
    pub bytes: Bytes,
    pub original_name: String,
    pub mime_type: String,
}

impl Upload {
    pub fn new(
        bytes: impl Into<Bytes>,
        original_name: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes: bytes.into(),
            original_name: original_name.into(),
            mime_type: mime_type.into(),
        }
    }
}

/// Result of persisting a blob through an attachment store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Path relative to the store root, `<folder>/<file_name>`
    pub file_path: String,
    /// Generated name of the stored file
    pub file_name: String,
}

/// Port to whatever holds attachment blobs. Failures surface as
/// validation-grade errors to the caller, never as process faults.
#[async_trait]
pub trait AttachmentStore: Send + Sync {
    async fn store(
        &self,
        blob: Bytes,
        folder: &str,
        original_name: &str,
    ) -> std::io::Result<StoredFile>;
}

/// Filesystem-backed store writing under a configured root directory.
/// Files are named `<uuid><original extension>` so collisions and
/// hostile names cannot occur.
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn generated_name(original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();
        format!("{}{extension}", Uuid::new_v4())
    }
}

#[async_trait]
impl AttachmentStore for FsAttachmentStore {
    async fn store(
        &self,
        blob: Bytes,
        folder: &str,
        original_name: &str,
    ) -> std::io::Result<StoredFile> {
        let file_name = Self::generated_name(original_name);
        let directory = self.root.join(folder);

        fs::create_dir_all(&directory).await?;
        fs::write(directory.join(&file_name), &blob).await?;

        info!(
            folder = folder,
            file_name = %file_name,
            size = blob.len(),
            "stored attachment blob"
        );

        Ok(StoredFile {
            file_path: format!("{folder}/{file_name}"),
            file_name,
        })
    }
}

/// Upload validation against the configured mime allow-lists and size caps
pub struct UploadValidator;

impl UploadValidator {
    /// Validate one upload before it is stored
    pub fn validate(upload: &Upload, config: &AttachmentConfig) -> ConversationResult<()> {
        if upload.original_name.trim().is_empty() {
            return Err(ConversationError::validation("File name cannot be empty"));
        }

        for invalid in ['/', '\\'] {
            if upload.original_name.contains(invalid) {
                return Err(ConversationError::validation(format!(
                    "File name contains invalid character: {invalid}"
                )));
            }
        }

        let is_media = config.media_mime_types.contains(&upload.mime_type);
        let is_file = config.file_mime_types.contains(&upload.mime_type);
        if !is_media && !is_file {
            return Err(ConversationError::validation(format!(
                "File type not allowed: {}",
                upload.mime_type
            )));
        }

        let cap = if is_media {
            config.max_media_size_bytes
        } else {
            config.max_file_size_bytes
        };
        if upload.bytes.len() as u64 > cap {
            return Err(ConversationError::validation(format!(
                "File too large (max {} bytes)",
                cap
            )));
        }

        Ok(())
    }

    /// Validate the number of uploads in one send
    pub fn batch_size(count: usize, config: &AttachmentConfig) -> ConversationResult<()> {
        if count > config.max_uploads as usize {
            return Err(ConversationError::validation(format!(
                "Too many uploads (max {})",
                config.max_uploads
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn png_upload(size: usize) -> Upload {
        Upload::new(vec![0u8; size], "photo.png", "image/png")
    }

    #[tokio::test]
    async fn fs_store_writes_uuid_named_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsAttachmentStore::new(temp_dir.path());

        let stored = store
            .store(Bytes::from_static(b"pixels"), "attachments", "photo.png")
            .await
            .unwrap();

        assert!(stored.file_name.ends_with(".png"));
        assert_ne!(stored.file_name, "photo.png");
        assert_eq!(stored.file_path, format!("attachments/{}", stored.file_name));

        let written = std::fs::read(temp_dir.path().join(&stored.file_path)).unwrap();
        assert_eq!(written, b"pixels");
    }

    #[tokio::test]
    async fn fs_store_handles_extensionless_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = FsAttachmentStore::new(temp_dir.path());

        let stored = store
            .store(Bytes::from_static(b"data"), "attachments", "README")
            .await
            .unwrap();
        assert!(!stored.file_name.contains('.'));
    }

    #[test]
    fn validator_accepts_allowed_media() {
        let config = AttachmentConfig::default();
        assert!(UploadValidator::validate(&png_upload(1024), &config).is_ok());
    }

    #[test]
    fn validator_rejects_unknown_mime_type() {
        let config = AttachmentConfig::default();
        let upload = Upload::new(vec![0u8; 16], "payload.exe", "application/x-msdownload");
        assert!(matches!(
            UploadValidator::validate(&upload, &config),
            Err(ConversationError::Validation { .. })
        ));
    }

    #[test]
    fn validator_rejects_oversized_uploads() {
        let mut config = AttachmentConfig::default();
        config.max_media_size_bytes = 512;
        assert!(UploadValidator::validate(&png_upload(1024), &config).is_err());
        assert!(UploadValidator::validate(&png_upload(512), &config).is_ok());
    }

    #[test]
    fn validator_rejects_path_characters_in_names() {
        let config = AttachmentConfig::default();
        let upload = Upload::new(vec![0u8; 16], "../../escape.png", "image/png");
        assert!(UploadValidator::validate(&upload, &config).is_err());
    }

    #[test]
    fn batch_size_is_capped() {
        let config = AttachmentConfig::default();
        assert!(UploadValidator::batch_size(10, &config).is_ok());
        assert!(UploadValidator::batch_size(11, &config).is_err());
    }
}
