//! Off-chain backup of the visible chat history to a pinning service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::common::ChatRecord;
use crate::error::{Error, Result};

/// Content-addressed URL of a pinned history document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupLocator {
    pub hash: String,
    pub url: String,
}

#[async_trait]
pub trait BackupUploader: Send + Sync {
    /// Pin the full history. All or nothing; no retry.
    async fn upload(&self, history: &[ChatRecord]) -> Result<BackupLocator>;
}

#[derive(Serialize)]
struct PinRequest<'a> {
    messages: &'a [ChatRecord],
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash", default)]
    ipfs_hash: Option<String>,
}

/// Pinata-style `pinJSONToIPFS` client.
pub struct PinningUploader {
    http: reqwest::Client,
    endpoint: String,
    gateway: String,
    jwt: String,
}

impl PinningUploader {
    pub fn new(
        http: reqwest::Client,
        endpoint: impl Into<String>,
        gateway: impl Into<String>,
        jwt: Option<String>,
    ) -> Result<Self> {
        let jwt = jwt.ok_or_else(|| {
            Error::Config("no pinning JWT found; set PINATA_JWT".to_string())
        })?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            gateway: gateway.into().trim_end_matches('/').to_string(),
            jwt,
        })
    }

    pub fn locator_for(&self, hash: &str) -> BackupLocator {
        BackupLocator {
            hash: hash.to_string(),
            url: format!("{}/ipfs/{hash}", self.gateway),
        }
    }

    async fn pin(&self, history: &[ChatRecord]) -> Result<BackupLocator> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.jwt)
            .json(&PinRequest { messages: history })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status.as_u16()));
        }

        let body: PinResponse = response.json().await?;
        match body.ipfs_hash {
            Some(hash) if !hash.is_empty() => Ok(self.locator_for(&hash)),
            _ => Err(Error::backup("pinning response had no IpfsHash")),
        }
    }
}

#[async_trait]
impl BackupUploader for PinningUploader {
    async fn upload(&self, history: &[ChatRecord]) -> Result<BackupLocator> {
        match self.pin(history).await {
            Ok(locator) => {
                log::info!("Pinned {} records at {}", history.len(), locator.url);
                Ok(locator)
            }
            Err(err) => {
                log::error!("Error uploading chat: {err}");
                Err(Error::backup_failed(err))
            }
        }
    }
}

/// Stands in when no pinning credentials are configured. Every send fails
/// at the backup step, so nothing is published unbacked.
pub struct DisabledBackup {
    reason: String,
}

impl DisabledBackup {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl BackupUploader for DisabledBackup {
    async fn upload(&self, _history: &[ChatRecord]) -> Result<BackupLocator> {
        Err(Error::backup(self.reason.clone()))
    }
}
