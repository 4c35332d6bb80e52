//! Template staging in Azure Blob Storage
//!
//! A local template is uploaded once per distinct content, named after the
//! SHA-256 of its bytes, and deployed by link.

use async_trait::async_trait;
use azure_storage_blobs::prelude::*;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::auth::provider::AzureAuthProvider;
use crate::config::StagingConfig;
use crate::deployment::models::TemplateLink;
use crate::error::{Result, RgDeployError};

pub const DEFAULT_CONTAINER: &str = "templates";

/// Trait for publishing a local template so it can be deployed by link
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateStager: Send + Sync {
    /// Upload `content` read from `file_name` and return the link to it
    async fn stage(&self, file_name: &str, content: Vec<u8>) -> Result<TemplateLink>;
}

/// Stager backed by a block blob container
pub struct BlobTemplateStager {
    storage_account: String,
    container_name: String,
    auth_provider: Arc<dyn AzureAuthProvider>,
}

impl BlobTemplateStager {
    pub fn new(
        auth_provider: Arc<dyn AzureAuthProvider>,
        storage_account: String,
        container_name: String,
    ) -> Result<Self> {
        if storage_account.trim().is_empty() {
            return Err(RgDeployError::config("Storage account name cannot be empty"));
        }

        let container_name = if container_name.trim().is_empty() {
            DEFAULT_CONTAINER.to_string()
        } else {
            container_name
        };

        Ok(Self {
            storage_account,
            container_name,
            auth_provider,
        })
    }

    pub fn from_config(auth_provider: Arc<dyn AzureAuthProvider>, staging: &StagingConfig) -> Result<Self> {
        Self::new(
            auth_provider,
            staging.storage_account.clone(),
            staging.container_name.clone(),
        )
    }

    pub fn container_name(&self) -> &str {
        &self.container_name
    }

    pub fn storage_account(&self) -> &str {
        &self.storage_account
    }
}

#[async_trait]
impl TemplateStager for BlobTemplateStager {
    async fn stage(&self, file_name: &str, content: Vec<u8>) -> Result<TemplateLink> {
        let blob_name = staged_blob_name(&content);
        debug!(file_name, blob_name = %blob_name, "staging template");

        let token_credential = self.auth_provider.get_token_credential();
        let blob_service = BlobServiceClient::new(&self.storage_account, token_credential);
        let blob_client = blob_service
            .container_client(&self.container_name)
            .blob_client(&blob_name);

        blob_client
            .put_block_blob(content)
            .content_type("application/json")
            .await
            .map_err(|e| {
                RgDeployError::azure_api(format!(
                    "Failed to stage template '{}' in container '{}': {e}",
                    file_name, self.container_name
                ))
            })?;

        let url = blob_client
            .url()
            .map_err(|e| RgDeployError::azure_api(format!("Failed to build blob URL: {e}")))?;

        info!(file_name, url = %url, "template staged");
        Ok(TemplateLink {
            uri: url.to_string(),
            content_version: None,
        })
    }
}

/// `{sha256}.json` of the template bytes
pub fn staged_blob_name(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    format!("{}.json", hex::encode(digest))
}
