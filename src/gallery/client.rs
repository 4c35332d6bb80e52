//! Gallery service client

use async_trait::async_trait;
use reqwest::{header::HeaderMap, Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use super::models::{parse_gallery_item, GalleryItem};
use crate::auth::provider::AzureAuthProvider;
use crate::error::{Result, RgDeployError};
use crate::template::models::{parse_template_parameters, ParameterDescriptor};
use crate::template::source::GALLERY_TEMPLATE_IDENTITY;
use crate::utils::network::{classify_network_error, create_http_client, NetworkConfig};

const GALLERY_API_VERSION: &str = "2015-10-01";

/// Trait for template gallery lookups
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GalleryClient: Send + Sync {
    /// Look up a gallery item by identity
    async fn get_gallery_item(&self, identity: &str) -> Result<GalleryItem>;

    /// Download the default deployment template of a gallery item
    async fn get_template_body(&self, item: &GalleryItem) -> Result<Value>;

    /// Parameter schema declared by the gallery item's template
    async fn get_template_parameters(&self, identity: &str) -> Result<Vec<ParameterDescriptor>> {
        let item = self.get_gallery_item(identity).await?;
        let body = self.get_template_body(&item).await?;
        parse_template_parameters(&body)
            .map_err(|details| RgDeployError::template_parse(GALLERY_TEMPLATE_IDENTITY, identity, details))
    }
}

/// Gallery client talking to the gallery REST endpoint
pub struct AzureGalleryClient {
    auth_provider: Arc<dyn AzureAuthProvider>,
    http_client: Client,
    endpoint: String,
    token_resource: String,
}

impl AzureGalleryClient {
    /// `endpoint` is the gallery root, `token_resource` the resource the
    /// bearer token is requested for (the management endpoint).
    pub fn new(
        auth_provider: Arc<dyn AzureAuthProvider>,
        endpoint: String,
        token_resource: String,
    ) -> Result<Self> {
        let http_client = create_http_client(&NetworkConfig::default())?;

        Ok(Self {
            auth_provider,
            http_client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            token_resource,
        })
    }

    fn item_url(&self, identity: &str) -> String {
        format!(
            "{}/Microsoft.Gallery/GalleryItems/{}?api-version={}",
            self.endpoint,
            urlencode_segment(identity),
            GALLERY_API_VERSION
        )
    }

    async fn create_headers(&self) -> Result<HeaderMap> {
        let token = self.auth_provider.bearer_token(&self.token_resource).await?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "Authorization",
            format!("Bearer {}", token).parse().map_err(|e| {
                RgDeployError::authentication(format!("Invalid token format: {}", e))
            })?,
        );
        Ok(headers)
    }

    /// Authenticated GET against the gallery endpoint
    async fn get_item_json(&self, url: &str, identity: &str) -> Result<Value> {
        let headers = self.create_headers().await?;
        let response = self
            .http_client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| classify_network_error(&e, url))?;

        match response.status() {
            status if status.is_success() => response.json().await.map_err(|e| {
                RgDeployError::serialization(format!("Failed to parse gallery response: {}", e))
            }),
            StatusCode::NOT_FOUND => Err(RgDeployError::gallery_lookup(identity, "HTTP 404: not found")),
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(RgDeployError::azure_api(format!("HTTP {}: {}", status.as_u16(), body)))
            }
        }
    }
}

#[async_trait]
impl GalleryClient for AzureGalleryClient {
    async fn get_gallery_item(&self, identity: &str) -> Result<GalleryItem> {
        let url = self.item_url(identity);
        debug!(identity, "looking up gallery item");
        let body = self.get_item_json(&url, identity).await?;

        parse_gallery_item(&body).ok_or_else(|| {
            RgDeployError::gallery_lookup(identity, "gallery item declares no deployment template")
        })
    }

    async fn get_template_body(&self, item: &GalleryItem) -> Result<Value> {
        let uri = item.template_uri.as_str();
        debug!(identity = %item.identity, uri, "downloading gallery template");

        // Template files are hosted outside the gallery; no credentials go with the request.
        let response = self
            .http_client
            .get(uri)
            .send()
            .await
            .map_err(|e| classify_network_error(&e, uri))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RgDeployError::gallery_lookup(
                &item.identity,
                format!("template download from '{}' failed with HTTP {}", uri, status.as_u16()),
            ));
        }

        response.json().await.map_err(|e| {
            RgDeployError::template_parse(GALLERY_TEMPLATE_IDENTITY, item.identity.as_str(), e.to_string())
        })
    }
}

/// Percent-encode a single URL path segment
fn urlencode_segment(segment: &str) -> String {
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;
    use azure_core::auth::{AccessToken, TokenCredential};
    use serde_json::json;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const MANAGEMENT_TOKEN: &str = "management-token";

    struct StaticToken;

    #[async_trait]
    impl AzureAuthProvider for StaticToken {
        async fn get_token(&self, _scopes: &[&str]) -> Result<AccessToken> {
            Err(RgDeployError::authentication("not available in tests"))
        }

        async fn bearer_token(&self, _resource: &str) -> Result<String> {
            Ok(MANAGEMENT_TOKEN.to_string())
        }

        fn get_token_credential(&self) -> Arc<dyn TokenCredential> {
            unimplemented!("not used in tests")
        }
    }

    /// Plain HTTP server answering gallery item and template requests;
    /// returns its base URL and the recorded request heads.
    async fn gallery_server(connections: usize) -> (String, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let requests = Arc::new(Mutex::new(Vec::new()));

        let template_url = format!("{base}/templates/site.json");
        let recorded = requests.clone();
        tokio::spawn(async move {
            for _ in 0..connections {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut head = Vec::new();
                let mut buffer = [0u8; 1024];
                while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                    let read = socket.read(&mut buffer).await.unwrap();
                    if read == 0 {
                        break;
                    }
                    head.extend_from_slice(&buffer[..read]);
                }
                let head = String::from_utf8_lossy(&head).to_string();

                let body = if head.starts_with("GET /Microsoft.Gallery/GalleryItems/") {
                    json!({
                        "identity": "Microsoft.WebSite.0.1.0",
                        "definitionTemplates": {
                            "deploymentTemplateFileUrls": { "Website": &template_url }
                        }
                    })
                } else {
                    json!({ "parameters": { "siteName": { "type": "string" } } })
                }
                .to_string();
                recorded.lock().unwrap().push(head);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        (base, requests)
    }

    #[test]
    fn test_urlencode_segment() {
        assert_eq!(urlencode_segment("Microsoft.WebSite.0.1.0"), "Microsoft.WebSite.0.1.0");
        assert_eq!(urlencode_segment("a b/c"), "a%20b%2Fc");
    }

    #[tokio::test]
    async fn test_template_download_carries_no_credentials() {
        let (base, requests) = gallery_server(2).await;
        let client = AzureGalleryClient::new(
            Arc::new(StaticToken),
            base,
            "https://management.azure.com".to_string(),
        )
        .unwrap();

        let parameters = client
            .get_template_parameters("Microsoft.WebSite.0.1.0")
            .await
            .unwrap();
        assert_eq!(parameters[0].name, "siteName");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        let (item, template) = (requests[0].to_lowercase(), requests[1].to_lowercase());
        assert!(item.contains(&format!("authorization: bearer {MANAGEMENT_TOKEN}")));
        assert!(template.starts_with("get /templates/site.json"));
        assert!(!template.contains("authorization:"));
    }

    #[tokio::test]
    async fn test_default_parameter_lookup_parses_template_body() {
        struct SingleItem;

        #[async_trait]
        impl GalleryClient for SingleItem {
            async fn get_gallery_item(&self, identity: &str) -> Result<GalleryItem> {
                Ok(GalleryItem {
                    identity: identity.to_string(),
                    display_name: "Website".to_string(),
                    publisher: "Microsoft".to_string(),
                    version: "1.0.0".to_string(),
                    template_uri: "https://gallery.example.com/Website.json".to_string(),
                })
            }

            async fn get_template_body(&self, item: &GalleryItem) -> Result<Value> {
                assert_eq!(item.identity, "Microsoft.WebSite");
                Ok(json!({"parameters": {"siteName": {"type": "string"}}}))
            }
        }

        let parameters = SingleItem.get_template_parameters("Microsoft.WebSite").await.unwrap();
        assert_eq!(parameters.len(), 1);
        assert_eq!(parameters[0].name, "siteName");
        assert!(parameters[0].mandatory);
    }
}
