use crate::error::{Result, RgDeployError};
use reqwest::Client;
use std::time::Duration;

/// Configuration for HTTP client with proper timeouts and user-friendly error handling
pub struct NetworkConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(120),
            user_agent: format!("rgdeploy/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create a properly configured HTTP client with timeouts
pub fn create_http_client(config: &NetworkConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(config.connect_timeout)
        .timeout(config.request_timeout)
        .user_agent(&config.user_agent)
        .build()
        .map_err(|e| RgDeployError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Map a transport failure to an error naming the host that was contacted
pub fn classify_network_error(error: &reqwest::Error, url: &str) -> RgDeployError {
    let host = extract_host(url);

    if error.is_timeout() {
        return RgDeployError::connection_timeout(format!(
            "Request to '{}' timed out. The service may be slow or unreachable.",
            host
        ));
    }

    if error.is_connect() {
        if is_dns_resolution_error(error) {
            return RgDeployError::network(format!(
                "Unable to resolve host '{}'. Please check the endpoint configuration.",
                host
            ));
        }

        return RgDeployError::network(format!(
            "Failed to connect to '{}'. Please check your network connection.",
            host
        ));
    }

    if let Some(status) = error.status() {
        match status.as_u16() {
            503 => {
                return RgDeployError::network(format!(
                    "Service at '{}' is temporarily unavailable (503).",
                    host
                ))
            }
            502 | 504 => {
                return RgDeployError::network(format!(
                    "Gateway error ({}) when accessing '{}'.",
                    status.as_u16(),
                    host
                ))
            }
            _ => {}
        }
    }

    RgDeployError::network(format!("Network error when accessing '{}': {}", host, error))
}

fn is_dns_resolution_error(error: &reqwest::Error) -> bool {
    let error_msg = error.to_string().to_lowercase();
    let dns_indicators = [
        "dns",
        "name resolution",
        "name or service not known",
        "nodename nor servname provided",
        "no such host",
        "could not resolve host",
    ];

    dns_indicators
        .iter()
        .any(|&indicator| error_msg.contains(indicator))
}

fn extract_host(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|h| h.to_string()))
        .unwrap_or_else(|| "unknown-host".to_string())
}

/// Check if an error is worth retrying
pub fn is_retryable_error(error: &RgDeployError) -> bool {
    match error {
        RgDeployError::ConnectionTimeout(_) => true,
        RgDeployError::NetworkError(msg) | RgDeployError::AzureApiError(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timed out")
                || msg_lower.contains("temporarily")
                || msg_lower.contains("429")
                || msg_lower.contains("503")
                || msg_lower.contains("502")
                || msg_lower.contains("504")
                || msg_lower.contains("throttl")
        }
        _ => false,
    }
}
