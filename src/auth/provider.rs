//! Authentication provider trait and implementations
//!
//! This module defines the authentication provider trait and provides
//! implementations for the Azure credential types the tool supports.

use async_trait::async_trait;
use azure_core::auth::{AccessToken, TokenCredential};
use azure_identity::{ClientSecretCredential, DefaultAzureCredential, TokenCredentialOptions};
use std::sync::Arc;
use tracing::debug;

use crate::config::Config;
use crate::error::{Result, RgDeployError};

const AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

/// Trait for Azure authentication providers
#[async_trait]
pub trait AzureAuthProvider: Send + Sync {
    /// Get an access token for the specified scopes
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken>;

    /// Get a bearer token string for a resource endpoint such as
    /// `https://management.azure.com`
    async fn bearer_token(&self, resource: &str) -> Result<String> {
        let scope = format!("{}/.default", resource.trim_end_matches('/'));
        let token = self.get_token(&[scope.as_str()]).await?;
        Ok(token.token.secret().to_string())
    }

    /// Get the underlying token credential for Azure SDK usage
    fn get_token_credential(&self) -> Arc<dyn TokenCredential>;
}

/// Default Azure Credential Provider using DefaultAzureCredential
pub struct DefaultAzureCredentialProvider {
    credential: Arc<DefaultAzureCredential>,
}

impl DefaultAzureCredentialProvider {
    pub fn new() -> Result<Self> {
        let credential = Arc::new(
            DefaultAzureCredential::create(TokenCredentialOptions::default()).map_err(|e| {
                RgDeployError::authentication(format!("Failed to create DefaultAzureCredential: {}", e))
            })?,
        );

        Ok(Self { credential })
    }
}

#[async_trait]
impl AzureAuthProvider for DefaultAzureCredentialProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| RgDeployError::authentication(format!("Failed to get token: {}", e)))
    }

    fn get_token_credential(&self) -> Arc<dyn TokenCredential> {
        self.credential.clone()
    }
}

/// Client Secret Authentication Provider for service principals
pub struct ClientSecretProvider {
    credential: Arc<ClientSecretCredential>,
}

impl ClientSecretProvider {
    pub fn new(tenant_id: String, client_id: String, client_secret: String) -> Result<Self> {
        let authority_url = url::Url::parse(AUTHORITY_HOST)
            .map_err(|e| RgDeployError::config(format!("Invalid authority URL: {}", e)))?;

        let http_client = Arc::new(reqwest::Client::new());
        let credential = Arc::new(ClientSecretCredential::new(
            http_client,
            authority_url,
            tenant_id,
            client_id,
            client_secret,
        ));

        Ok(Self { credential })
    }
}

#[async_trait]
impl AzureAuthProvider for ClientSecretProvider {
    async fn get_token(&self, scopes: &[&str]) -> Result<AccessToken> {
        self.credential
            .get_token(scopes)
            .await
            .map_err(|e| RgDeployError::authentication(format!("Failed to get token: {}", e)))
    }

    fn get_token_credential(&self) -> Arc<dyn TokenCredential> {
        self.credential.clone()
    }
}

/// Authentication provider factory
pub struct AuthProviderFactory;

impl AuthProviderFactory {
    /// Use a service principal when `AZURE_CLIENT_ID` and
    /// `AZURE_CLIENT_SECRET` are set together with a tenant, otherwise
    /// fall back to `DefaultAzureCredential`.
    pub fn create_provider(config: &Config) -> Result<Arc<dyn AzureAuthProvider>> {
        let client_id = std::env::var("AZURE_CLIENT_ID").ok();
        let client_secret = std::env::var("AZURE_CLIENT_SECRET").ok();

        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) if !config.tenant_id.is_empty() => {
                debug!("using client secret credential");
                Ok(Arc::new(ClientSecretProvider::new(
                    config.tenant_id.clone(),
                    client_id,
                    client_secret,
                )?))
            }
            _ => {
                debug!("using default Azure credential chain");
                Ok(Arc::new(DefaultAzureCredentialProvider::new()?))
            }
        }
    }
}
