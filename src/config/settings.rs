//! Configuration settings management
//!
//! This module handles loading configuration from multiple sources,
//! validation, and persistence.

use crate::deployment::models::DeploymentMode;
use crate::error::{Result, RgDeployError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tabled::Tabled;

pub const DEFAULT_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
pub const DEFAULT_GALLERY_ENDPOINT: &str = "https://gallery.azure.com";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Storage account used to stage local templates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagingConfig {
    pub storage_account: String,
    #[serde(default = "default_container_name")]
    pub container_name: String,
}

fn default_container_name() -> String {
    crate::blob::DEFAULT_CONTAINER.to_string()
}

impl Default for StagingConfig {
    fn default() -> Self {
        Self {
            storage_account: String::new(),
            container_name: default_container_name(),
        }
    }
}

fn display_staging(staging: &Option<StagingConfig>) -> String {
    match staging {
        Some(staging) if !staging.storage_account.is_empty() => {
            format!("{}/{}", staging.storage_account, staging.container_name)
        }
        _ => "-".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(default)]
pub struct Config {
    #[tabled(rename = "Debug")]
    pub debug: bool,
    #[tabled(rename = "Subscription ID")]
    pub subscription_id: String,
    #[tabled(skip)]
    pub tenant_id: String,
    #[tabled(rename = "Default Resource Group")]
    pub default_resource_group: String,
    #[tabled(rename = "Management Endpoint")]
    pub management_endpoint: String,
    #[tabled(rename = "Gallery Endpoint")]
    pub gallery_endpoint: String,
    #[tabled(rename = "Default Mode")]
    pub default_mode: DeploymentMode,
    #[tabled(rename = "Poll Interval (s)")]
    pub poll_interval_secs: u64,
    #[tabled(rename = "JSON Output")]
    pub output_json: bool,
    #[tabled(rename = "No Color")]
    pub no_color: bool,
    #[tabled(rename = "Staging", display_with = "display_staging")]
    pub staging: Option<StagingConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            subscription_id: String::new(),
            tenant_id: String::new(),
            default_resource_group: String::new(),
            management_endpoint: DEFAULT_MANAGEMENT_ENDPOINT.to_string(),
            gallery_endpoint: DEFAULT_GALLERY_ENDPOINT.to_string(),
            default_mode: DeploymentMode::Incremental,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            output_json: false,
            no_color: false,
            staging: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.subscription_id.is_empty() {
            return Err(RgDeployError::config(
                "Subscription ID is required. Set AZURE_SUBSCRIPTION_ID or run 'rgd config set subscription_id <id>'",
            ));
        }

        if self.poll_interval_secs == 0 {
            return Err(RgDeployError::config("poll_interval_secs must be at least 1"));
        }

        url::Url::parse(&self.management_endpoint).map_err(|e| {
            RgDeployError::config(format!("Invalid management endpoint '{}': {e}", self.management_endpoint))
        })?;

        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        #[cfg(any(target_os = "linux", target_os = "macos"))]
        {
            use std::env;
            let config_dir = if let Ok(xdg_config_home) = env::var("XDG_CONFIG_HOME") {
                PathBuf::from(xdg_config_home)
            } else {
                let home_dir = env::var("HOME")
                    .map_err(|_| RgDeployError::config("HOME environment variable not set"))?;
                PathBuf::from(home_dir).join(".config")
            };
            Ok(config_dir.join("rgd").join("rgd.conf"))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos")))]
        {
            let config_dir = dirs::config_dir()
                .ok_or_else(|| RgDeployError::config("Unable to determine config directory"))?;
            Ok(config_dir.join("rgd").join("rgd.conf"))
        }
    }

    pub async fn load() -> Result<Self> {
        load_config().await
    }

    pub async fn save(&self) -> Result<()> {
        save_config(self).await
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    /// Resolve resource group.
    /// Priority: CLI argument > config default
    pub fn resolve_resource_group(&self, rg_arg: Option<String>) -> Result<String> {
        if let Some(rg) = rg_arg.filter(|rg| !rg.trim().is_empty()) {
            return Ok(rg);
        }

        if !self.default_resource_group.is_empty() {
            return Ok(self.default_resource_group.clone());
        }

        Err(RgDeployError::config(
            "No resource group specified. Use --resource-group or configure default_resource_group",
        ))
    }

    /// Staging configuration with a storage account, if any
    pub fn staging_config(&self) -> Option<&StagingConfig> {
        self.staging
            .as_ref()
            .filter(|staging| !staging.storage_account.is_empty())
    }

    /// Set a single configuration key from its string form
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "debug" => self.debug = parse_flag(value),
            "subscription_id" => self.subscription_id = value.to_string(),
            "tenant_id" => self.tenant_id = value.to_string(),
            "default_resource_group" => self.default_resource_group = value.to_string(),
            "management_endpoint" => self.management_endpoint = value.to_string(),
            "gallery_endpoint" => self.gallery_endpoint = value.to_string(),
            "default_mode" => {
                self.default_mode = value.parse().map_err(RgDeployError::config)?;
            }
            "poll_interval_secs" => {
                self.poll_interval_secs = value.parse::<u64>().map_err(|_| {
                    RgDeployError::config(format!("Invalid value for poll_interval_secs: {value}"))
                })?;
            }
            "output_json" => self.output_json = parse_flag(value),
            "no_color" => self.no_color = parse_flag(value),
            "storage_account" => {
                let mut staging = self.staging.clone().unwrap_or_default();
                staging.storage_account = value.to_string();
                self.staging = Some(staging);
            }
            "storage_container" => {
                let mut staging = self.staging.clone().unwrap_or_default();
                staging.container_name = value.to_string();
                self.staging = Some(staging);
            }
            _ => {
                return Err(RgDeployError::config(format!(
                    "Unknown configuration key: {key}. Available keys: {}",
                    CONFIG_KEYS.join(", ")
                )));
            }
        }
        Ok(())
    }
}

pub const CONFIG_KEYS: &[&str] = &[
    "debug",
    "subscription_id",
    "tenant_id",
    "default_resource_group",
    "management_endpoint",
    "gallery_endpoint",
    "default_mode",
    "poll_interval_secs",
    "output_json",
    "no_color",
    "storage_account",
    "storage_container",
];

fn parse_flag(value: &str) -> bool {
    value.to_lowercase() == "true" || value == "1"
}

/// Load configuration from multiple sources with priority order:
/// 1. Command-line flags (handled by clap)
/// 2. Environment variables
/// 3. Configuration file
/// 4. Default values
pub async fn load_config() -> Result<Config> {
    let config = load_config_no_validation().await?;

    config.validate()?;

    Ok(config)
}

/// Load configuration without validation (for config commands)
pub async fn load_config_no_validation() -> Result<Config> {
    let mut config = Config::default();

    let config_path = Config::get_config_path()?;
    if tokio::fs::try_exists(&config_path).await.unwrap_or(false) {
        config = load_from_file(&config_path).await?;
    }

    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    Ok(config)
}

pub async fn load_from_file(path: &Path) -> Result<Config> {
    let contents = tokio::fs::read_to_string(path).await?;

    // TOML first, JSON as fallback
    if let Ok(config) = toml::from_str::<Config>(&contents) {
        return Ok(config);
    }

    serde_json::from_str::<Config>(&contents).map_err(|e| {
        RgDeployError::config(format!("Failed to parse {}: {e}", path.display()))
    })
}

/// Apply environment overrides read through `lookup`
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("DEBUG") {
        config.debug = parse_flag(&value);
    }

    if let Some(value) = lookup("AZURE_SUBSCRIPTION_ID") {
        config.subscription_id = value;
    }

    if let Some(value) = lookup("AZURE_TENANT_ID") {
        config.tenant_id = value;
    }

    if let Some(value) = lookup("DEFAULT_RESOURCE_GROUP") {
        config.default_resource_group = value;
    }

    if let Some(value) = lookup("ARM_ENDPOINT") {
        config.management_endpoint = value;
    }

    if let Some(value) = lookup("GALLERY_ENDPOINT") {
        config.gallery_endpoint = value;
    }

    if let Some(value) = lookup("RGD_POLL_INTERVAL") {
        match value.parse::<u64>() {
            Ok(seconds) => config.poll_interval_secs = seconds,
            Err(_) => tracing::warn!(value = %value, "ignoring invalid RGD_POLL_INTERVAL"),
        }
    }

    let account = lookup("AZURE_STORAGE_ACCOUNT");
    let container = lookup("AZURE_STORAGE_CONTAINER");
    if account.is_some() || container.is_some() {
        let mut staging = config.staging.clone().unwrap_or_default();
        if let Some(account) = account {
            staging.storage_account = account;
        }
        if let Some(container) = container {
            staging.container_name = container;
        }
        config.staging = Some(staging);
    }
}

pub async fn save_config(config: &Config) -> Result<()> {
    let config_path = Config::get_config_path()?;
    save_to_file(config, &config_path).await
}

pub async fn save_to_file(config: &Config, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let contents = toml::to_string_pretty(config)
        .map_err(|e| RgDeployError::serialization(e.to_string()))?;

    tokio::fs::write(path, contents).await?;

    Ok(())
}
