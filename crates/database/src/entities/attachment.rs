//! Attachment entity definitions

use serde::{Deserialize, Serialize};

/// Stored file metadata; exactly one message references each row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub file_path: String,
    pub file_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub url: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAttachmentRequest {
    pub file_path: String,
    pub file_name: String,
    pub original_name: String,
    pub mime_type: String,
    pub url: String,
}
