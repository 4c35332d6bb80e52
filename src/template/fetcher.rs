//! Reading template and parameter documents from local paths or URIs

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{Result, RgDeployError};
use crate::utils::helpers::{is_remote_uri, resolve_path};
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};

/// Reads the raw bytes behind a local path or a remote URI
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TemplateFetcher: Send + Sync {
    /// Read `location`; failures are reported as `SourceUnreachable`
    async fn read(&self, location: &str) -> Result<Vec<u8>>;
}

/// Fetcher backed by the local filesystem and an HTTP client
pub struct DefaultTemplateFetcher {
    http_client: Client,
}

impl DefaultTemplateFetcher {
    pub fn new() -> Result<Self> {
        let http_client = create_http_client(&NetworkConfig::default())?;
        Ok(Self { http_client })
    }

    pub fn with_client(http_client: Client) -> Self {
        Self { http_client }
    }

    async fn read_uri(&self, uri: &str) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .get(uri)
            .send()
            .await
            .map_err(|e| RgDeployError::source_unreachable(uri, classify_network_error(&e, uri)))?;

        if !response.status().is_success() {
            return Err(RgDeployError::source_unreachable(
                uri,
                format!("HTTP {}", response.status().as_u16()),
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| RgDeployError::source_unreachable(uri, e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl TemplateFetcher for DefaultTemplateFetcher {
    async fn read(&self, location: &str) -> Result<Vec<u8>> {
        if is_remote_uri(location) {
            debug!(uri = location, "downloading template document");
            self.read_uri(location).await
        } else {
            let path = resolve_path(location);
            debug!(path = %path.display(), "reading template document");
            tokio::fs::read(&path)
                .await
                .map_err(|e| RgDeployError::source_unreachable(path.display().to_string(), e))
        }
    }
}
