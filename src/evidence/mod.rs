//! Evidence capture: full-page screenshots handed to durable storage

mod storage;

pub use storage::{AppwriteStorage, ObjectStorage, StorageSettings, StoredFile, UploadFile};

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::info;

use crate::browser::MonitorPage;
use crate::utils::constants::SCREENSHOT_MIME;
use crate::utils::{MonitorResult, with_timeout};

/// Which path of the run produced the screenshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceKind {
    Success,
    Error,
}

impl EvidenceKind {
    fn prefix(self) -> &'static str {
        match self {
            EvidenceKind::Success => "screenshot",
            EvidenceKind::Error => "error-screenshot",
        }
    }
}

/// A captured screenshot awaiting upload
#[derive(Debug, Clone)]
pub struct EvidenceArtifact {
    pub id: String,
    pub filename: String,
    pub mime_type: &'static str,
    pub bytes: Vec<u8>,
}

impl EvidenceArtifact {
    pub fn new(bytes: Vec<u8>, kind: EvidenceKind) -> Self {
        Self::at(bytes, kind, Utc::now())
    }

    fn at(bytes: Vec<u8>, kind: EvidenceKind, captured_at: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            filename: artifact_filename(kind, captured_at),
            mime_type: SCREENSHOT_MIME,
            bytes,
        }
    }
}

/// `screenshot-2025-03-01T12-30-00-000Z.png`: ISO-8601 with `:` and `.`
/// replaced so the name is safe on every filesystem
fn artifact_filename(kind: EvidenceKind, captured_at: DateTime<Utc>) -> String {
    let stamp = captured_at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}-{}.png", kind.prefix(), stamp)
}

/// Full-document screenshot of `page`
pub async fn capture(page: &dyn MonitorPage, timeout: Duration) -> MonitorResult<Vec<u8>> {
    let bytes = with_timeout("screenshot", timeout, page.screenshot_full_page()).await?;
    info!("Captured screenshot ({} bytes)", bytes.len());
    Ok(bytes)
}

/// Upload `artifact`, returning the storage-assigned id
pub async fn persist(
    storage: &dyn ObjectStorage,
    bucket_id: &str,
    artifact: &EvidenceArtifact,
) -> MonitorResult<String> {
    let stored = storage
        .create_file(
            bucket_id,
            &artifact.id,
            UploadFile {
                filename: artifact.filename.clone(),
                mime_type: artifact.mime_type.to_string(),
                bytes: artifact.bytes.clone(),
            },
        )
        .await?;
    info!("Stored {} as {}", artifact.filename, stored.id);
    Ok(stored.id)
}
