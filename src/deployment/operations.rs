//! Deployment operations implementation
//!
//! This module talks to the Resource Manager deployments API: submitting,
//! reading, listing, cancelling and validating resource group deployments.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use super::models::DeploymentRequest;
use crate::auth::provider::AzureAuthProvider;
use crate::error::{Result, RgDeployError};
use crate::utils::cancel::CancellationSignal;
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};
use crate::utils::retry::{retry_with_backoff, RetryOptions};

pub const DEPLOYMENTS_API_VERSION: &str = "2021-04-01";

/// Trait for deployment operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeploymentOperations: Send + Sync {
    /// Create or update a deployment, returning the raw deployment resource
    async fn submit(&self, request: &DeploymentRequest) -> Result<Value>;

    /// Get the current state of a deployment
    async fn get_status(&self, resource_group: &str, deployment_name: &str) -> Result<Value>;

    /// List the deployments of a resource group
    async fn list(&self, resource_group: &str) -> Result<Vec<Value>>;

    /// Cancel a running deployment
    async fn cancel(&self, resource_group: &str, deployment_name: &str) -> Result<()>;

    /// Validate a deployment without executing it
    async fn validate(&self, request: &DeploymentRequest) -> Result<Value>;
}

/// Azure Resource Manager deployment operations
pub struct AzureDeploymentOperations {
    auth_provider: Arc<dyn AzureAuthProvider>,
    http_client: Client,
    management_endpoint: String,
    subscription_id: String,
    retry_options: RetryOptions,
    cancel: CancellationSignal,
}

impl AzureDeploymentOperations {
    pub fn new(
        auth_provider: Arc<dyn AzureAuthProvider>,
        management_endpoint: String,
        subscription_id: String,
        cancel: CancellationSignal,
    ) -> Result<Self> {
        let http_client = create_http_client(&NetworkConfig::default())?;

        Ok(Self {
            auth_provider,
            http_client,
            management_endpoint: management_endpoint.trim_end_matches('/').to_string(),
            subscription_id,
            retry_options: RetryOptions {
                max_retries: 3,
                initial_interval: std::time::Duration::from_millis(1000),
                max_interval: std::time::Duration::from_millis(10000),
                multiplier: 2.0,
            },
            cancel,
        })
    }

    /// Create authorized headers for Azure REST API
    async fn create_headers(&self) -> Result<HeaderMap> {
        let token = self.auth_provider.bearer_token(&self.management_endpoint).await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bearer {}", token).parse().map_err(|e| {
                RgDeployError::authentication(format!("Invalid token format: {}", e))
            })?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    fn deployments_path(&self, resource_group: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourcegroups/{}/providers/Microsoft.Resources/deployments",
            self.management_endpoint, self.subscription_id, resource_group
        )
    }

    /// Build the URL of a deployment, optionally with an action suffix such as `cancel`
    fn deployment_url(&self, resource_group: &str, deployment_name: &str, action: Option<&str>) -> String {
        let mut url = format!("{}/{}", self.deployments_path(resource_group), deployment_name);
        if let Some(action) = action {
            url.push('/');
            url.push_str(action);
        }
        format!("{}?api-version={}", url, DEPLOYMENTS_API_VERSION)
    }

    /// Parse Azure error response
    fn parse_azure_error(&self, status: u16, body: &str) -> RgDeployError {
        match arm_error_message(body) {
            Some(message) => RgDeployError::azure_api(format!("HTTP {}: {}", status, message)),
            None => RgDeployError::azure_api(format!("HTTP {}: {}", status, body)),
        }
    }

    async fn send(&self, method: Method, url: &str, body: Option<&Value>) -> Result<reqwest::Response> {
        let headers = self.create_headers().await?;
        let mut request = self.http_client.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(|e| classify_network_error(&e, url))
    }

    async fn read_json(&self, response: reqwest::Response, what: &str) -> Result<Value> {
        if !response.status().is_success() {
            let status_code = response.status().as_u16();
            let error_body = response.text().await.unwrap_or_default();
            return Err(self.parse_azure_error(status_code, &error_body));
        }

        response.json().await.map_err(|e| {
            RgDeployError::serialization(format!("Failed to parse {} response: {}", what, e))
        })
    }

    /// Retry wrapper for Azure operations
    async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        retry_with_backoff(operation, self.retry_options.clone(), &self.cancel).await
    }
}

#[async_trait]
impl DeploymentOperations for AzureDeploymentOperations {
    async fn submit(&self, request: &DeploymentRequest) -> Result<Value> {
        let url = self.deployment_url(&request.resource_group, &request.deployment_name, None);
        let body = request.to_request_body();
        info!(
            resource_group = %request.resource_group,
            deployment = %request.deployment_name,
            mode = %request.mode,
            "submitting deployment"
        );

        let operation = || async {
            let response = self.send(Method::PUT, &url, Some(&body)).await?;
            self.read_json(response, "deployment").await
        };

        self.execute_with_retry(operation).await
    }

    async fn get_status(&self, resource_group: &str, deployment_name: &str) -> Result<Value> {
        let url = self.deployment_url(resource_group, deployment_name, None);

        let operation = || async {
            let response = self.send(Method::GET, &url, None).await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Err(RgDeployError::azure_api(format!(
                    "Deployment '{}' not found in resource group '{}'",
                    deployment_name, resource_group
                )));
            }
            self.read_json(response, "deployment").await
        };

        self.execute_with_retry(operation).await
    }

    async fn list(&self, resource_group: &str) -> Result<Vec<Value>> {
        let mut deployments = Vec::new();
        let mut next_url = Some(format!(
            "{}?api-version={}",
            self.deployments_path(resource_group),
            DEPLOYMENTS_API_VERSION
        ));

        while let Some(url) = next_url.take() {
            debug!(%url, "listing deployments");
            let operation = || async {
                let response = self.send(Method::GET, &url, None).await?;
                self.read_json(response, "deployment list").await
            };
            let page = self.execute_with_retry(operation).await?;

            if let Some(values) = page.get("value").and_then(Value::as_array) {
                deployments.extend(values.iter().cloned());
            }
            next_url = page
                .get("nextLink")
                .and_then(Value::as_str)
                .filter(|link| !link.is_empty())
                .map(str::to_string);
        }

        Ok(deployments)
    }

    async fn cancel(&self, resource_group: &str, deployment_name: &str) -> Result<()> {
        let url = self.deployment_url(resource_group, deployment_name, Some("cancel"));

        let operation = || async {
            let response = self.send(Method::POST, &url, None).await?;
            if !response.status().is_success() {
                let status_code = response.status().as_u16();
                let error_body = response.text().await.unwrap_or_default();
                return Err(self.parse_azure_error(status_code, &error_body));
            }
            Ok(())
        };

        self.execute_with_retry(operation).await?;
        info!(resource_group, deployment = deployment_name, "deployment cancellation requested");
        Ok(())
    }

    async fn validate(&self, request: &DeploymentRequest) -> Result<Value> {
        let url = self.deployment_url(&request.resource_group, &request.deployment_name, Some("validate"));
        let body = request.to_request_body();

        let operation = || async {
            let response = self.send(Method::POST, &url, Some(&body)).await?;
            // A failed validation comes back as 400 with the reason in the body
            if response.status() == StatusCode::BAD_REQUEST {
                let error_body = response.text().await.unwrap_or_default();
                return match serde_json::from_str::<Value>(&error_body) {
                    Ok(value) if value.get("error").is_some() => Ok(value),
                    _ => Err(self.parse_azure_error(400, &error_body)),
                };
            }
            self.read_json(response, "validation").await
        };

        self.execute_with_retry(operation).await
    }
}

/// The `error.message` of an ARM error body, including nested details
pub fn arm_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    error_message(value.get("error")?)
}

pub(crate) fn error_message(error: &Value) -> Option<String> {
    let message = error.get("message").and_then(Value::as_str)?;
    let details: Vec<String> = error
        .get("details")
        .and_then(Value::as_array)
        .map(|details| details.iter().filter_map(error_message).collect())
        .unwrap_or_default();

    if details.is_empty() {
        Some(message.to_string())
    } else {
        Some(format!("{} ({})", message, details.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use azure_core::auth::{AccessToken, TokenCredential};

    struct NoAuth;

    #[async_trait]
    impl AzureAuthProvider for NoAuth {
        async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken> {
            Err(RgDeployError::authentication("not available in tests"))
        }

        fn get_token_credential(&self) -> Arc<dyn TokenCredential> {
            unimplemented!("not used in tests")
        }
    }

    fn operations() -> AzureDeploymentOperations {
        AzureDeploymentOperations::new(
            Arc::new(NoAuth),
            "https://management.azure.com/".to_string(),
            "0000".to_string(),
            CancellationSignal::never(),
        )
        .unwrap()
    }

    #[test]
    fn test_deployment_urls() {
        let ops = operations();
        assert_eq!(
            ops.deployment_url("web-rg", "site", None),
            "https://management.azure.com/subscriptions/0000/resourcegroups/web-rg/providers/Microsoft.Resources/deployments/site?api-version=2021-04-01"
        );
        assert!(ops
            .deployment_url("web-rg", "site", Some("cancel"))
            .ends_with("/deployments/site/cancel?api-version=2021-04-01"));
    }

    #[test]
    fn test_arm_error_message() {
        let body = r#"{"error":{"code":"InvalidTemplate","message":"Deployment template validation failed","details":[{"code":"X","message":"parameter 'size' is missing"}]}}"#;
        assert_eq!(
            arm_error_message(body).as_deref(),
            Some("Deployment template validation failed (parameter 'size' is missing)")
        );
        assert_eq!(arm_error_message("not json"), None);

        let error = operations().parse_azure_error(409, r#"{"error":{"message":"busy"}}"#);
        assert_eq!(error.to_string(), "Azure API error: HTTP 409: busy");
    }

    #[tokio::test]
    async fn test_authentication_failure_is_not_retried() {
        let result = operations().get_status("web-rg", "site").await;
        assert!(matches!(result, Err(RgDeployError::AuthenticationError(_))));
    }
}
