//! Attachment storage.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use messenger::Attachment;
use report_flow::{MediaUrls, PrefixMediaUrls};
use tracing::{debug, info};

use crate::error::OrchestratorError;

/// Folder every stored attachment key starts with.
pub const MEDIA_FOLDER: &str = "saved_attachments";

/// Stores uploaded attachments and resolves their keys to public URLs.
#[async_trait]
pub trait MediaStore: MediaUrls {
    /// Download and store an attachment, returning its key.
    async fn save(
        &self,
        user_id: &str,
        attachment: &Attachment,
    ) -> Result<String, OrchestratorError>;
}

/// The key an attachment of `user_id` is stored under:
/// `saved_attachments/<user_id>/<file name from the URL path>`.
pub fn media_key(user_id: &str, attachment: &Attachment) -> Result<String, OrchestratorError> {
    let file_name = attachment
        .file_name()
        .ok_or_else(|| OrchestratorError::Media("attachment has no file name".to_string()))?;

    if !is_safe_segment(user_id) || !is_safe_segment(&file_name) {
        return Err(OrchestratorError::Media(format!(
            "unsafe path segment: {}/{}",
            user_id, file_name
        )));
    }

    Ok(format!("{}/{}/{}", MEDIA_FOLDER, user_id, file_name))
}

fn is_safe_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\'])
}

/// Media store writing files under a local directory that is served at a
/// public base URL.
#[derive(Debug, Clone)]
pub struct LocalMediaStore {
    root: PathBuf,
    urls: PrefixMediaUrls,
    http: reqwest::Client,
}

impl LocalMediaStore {
    pub fn new(
        root: impl Into<PathBuf>,
        base_url: impl Into<String>,
    ) -> Result<Self, OrchestratorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| OrchestratorError::Media(e.to_string()))?;

        Ok(Self {
            root: root.into(),
            urls: PrefixMediaUrls::new(base_url),
            http,
        })
    }

    /// Directory the keys are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, OrchestratorError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| OrchestratorError::Media(format!("download failed: {}", e)))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| OrchestratorError::Media(format!("download failed: {}", e)))?;
        Ok(bytes.to_vec())
    }
}

impl MediaUrls for LocalMediaStore {
    fn url_for(&self, key: &str) -> String {
        self.urls.url_for(key)
    }
}

#[async_trait]
impl MediaStore for LocalMediaStore {
    async fn save(
        &self,
        user_id: &str,
        attachment: &Attachment,
    ) -> Result<String, OrchestratorError> {
        let key = media_key(user_id, attachment)?;
        let url = attachment
            .url()
            .ok_or_else(|| OrchestratorError::Media("attachment has no URL".to_string()))?;

        debug!("Downloading attachment for {}: {}", user_id, url);
        let bytes = self.download(url).await?;

        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| OrchestratorError::Media(e.to_string()))?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| OrchestratorError::Media(e.to_string()))?;

        info!("Stored {} ({} bytes)", key, bytes.len());
        Ok(key)
    }
}
