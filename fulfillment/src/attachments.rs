//! Attachment store collaborator
//!
//! Cancellation evidence images are uploaded out-of-band: the core only
//! requests an opaque upload ticket (filename + pre-authorized URL) and
//! indexes the filename so the file can be associated when it lands.

use async_trait::async_trait;
use shared::error::{AppError, AppResult};
use shared::models::UploadTicket;
use std::time::Duration;
use uuid::Uuid;

/// Supported evidence image formats
pub const SUPPORTED_EVIDENCE_FORMATS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Validity window for evidence upload tickets
pub const EVIDENCE_TICKET_TTL: Duration = Duration::from_secs(15 * 60);

/// Upload ticket issuer and signed-URL resolver
#[async_trait]
pub trait AttachmentStore: Clone + Send + Sync + 'static {
    /// Issue a ticket for uploading one file with the given extension
    async fn issue_upload_ticket(&self, ttl: Duration, extension: &str) -> AppResult<UploadTicket>;

    /// Signed download URL for a previously uploaded file
    async fn signed_url(&self, filename: &str) -> AppResult<String>;
}

/// Attachment store issuing tickets under a fixed base URL
#[derive(Clone)]
pub struct LocalAttachmentStore {
    base_url: String,
}

impl LocalAttachmentStore {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl Default for LocalAttachmentStore {
    fn default() -> Self {
        Self::new("/uploads/evidence")
    }
}

#[async_trait]
impl AttachmentStore for LocalAttachmentStore {
    async fn issue_upload_ticket(&self, ttl: Duration, extension: &str) -> AppResult<UploadTicket> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        if !SUPPORTED_EVIDENCE_FORMATS.contains(&ext.as_str()) {
            return Err(AppError::validation(format!(
                "Unsupported file format '{}'. Supported: {}",
                ext,
                SUPPORTED_EVIDENCE_FORMATS.join(", ")
            )));
        }

        let filename = format!("{}.{}", Uuid::new_v4(), ext);
        let upload_url = format!(
            "{}/{}?ttl={}",
            self.base_url,
            filename,
            ttl.as_secs()
        );
        Ok(UploadTicket {
            filename,
            upload_url,
        })
    }

    async fn signed_url(&self, filename: &str) -> AppResult<String> {
        Ok(format!("{}/{}", self.base_url, filename))
    }
}
