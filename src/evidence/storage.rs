//! Durable blob storage for screenshots (Appwrite Storage REST API)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::debug;

use crate::utils::{MonitorError, MonitorResult};

/// Payload handed to the storage collaborator
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Storage-assigned handle for an uploaded file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredFile {
    #[serde(rename = "$id")]
    pub id: String,
}

/// Blob upload capability
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        file: UploadFile,
    ) -> MonitorResult<StoredFile>;
}

/// The four required storage settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageSettings {
    pub endpoint: String,
    pub project_id: String,
    pub api_key: String,
    pub bucket_id: String,
}

pub struct AppwriteStorage {
    client: reqwest::Client,
    endpoint: String,
    project_id: String,
    api_key: String,
}

impl AppwriteStorage {
    pub fn new(settings: &StorageSettings) -> MonitorResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| MonitorError::Configuration(format!("failed to build storage client: {e}")))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            project_id: settings.project_id.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl ObjectStorage for AppwriteStorage {
    async fn create_file(
        &self,
        bucket_id: &str,
        file_id: &str,
        file: UploadFile,
    ) -> MonitorResult<StoredFile> {
        let url = format!("{}/storage/buckets/{}/files", self.endpoint, bucket_id);
        let size = file.bytes.len();

        let part = Part::bytes(file.bytes)
            .file_name(file.filename)
            .mime_str(&file.mime_type)?;
        let form = Form::new()
            .text("fileId", file_id.to_string())
            .part("file", part);

        let response = self
            .client
            .post(&url)
            .header("X-Appwrite-Project", &self.project_id)
            .header("X-Appwrite-Key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MonitorError::Upload(format!(
                "storage rejected {file_id} with HTTP {status}: {body}"
            )));
        }

        let stored: StoredFile = response.json().await?;
        debug!("Uploaded {} bytes to bucket {} as {}", size, bucket_id, stored.id);
        Ok(stored)
    }
}
