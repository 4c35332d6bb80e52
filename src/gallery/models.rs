//! Gallery data models

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tabled::Tabled;

/// Template references of a gallery item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DefinitionTemplates {
    #[serde(default)]
    pub default_deployment_template_id: Option<String>,
    #[serde(default)]
    pub deployment_template_file_urls: HashMap<String, String>,
}

/// A gallery item as returned by the gallery service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItemResponse {
    pub identity: String,
    #[serde(default)]
    pub item_display_name: Option<String>,
    #[serde(default)]
    pub publisher: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub definition_templates: Option<DefinitionTemplates>,
}

/// Gallery item summary used by deployments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct GalleryItem {
    #[tabled(rename = "Identity")]
    pub identity: String,
    #[tabled(rename = "Name")]
    pub display_name: String,
    #[tabled(rename = "Publisher")]
    pub publisher: String,
    #[tabled(rename = "Version")]
    pub version: String,
    #[tabled(rename = "Template URI")]
    pub template_uri: String,
}

impl GalleryItemResponse {
    /// Resolve the default deployment template URI; `None` when the item
    /// declares no deployment template.
    pub fn into_gallery_item(self) -> Option<GalleryItem> {
        let templates = self.definition_templates?;
        let template_uri = match &templates.default_deployment_template_id {
            Some(id) => templates.deployment_template_file_urls.get(id).cloned(),
            None if templates.deployment_template_file_urls.len() == 1 => {
                templates.deployment_template_file_urls.values().next().cloned()
            }
            None => None,
        }?;

        Some(GalleryItem {
            display_name: self.item_display_name.unwrap_or_else(|| self.identity.clone()),
            publisher: self.publisher.unwrap_or_default(),
            version: self.version.unwrap_or_default(),
            identity: self.identity,
            template_uri,
        })
    }
}

/// Parse a gallery item response body
pub fn parse_gallery_item(body: &Value) -> Option<GalleryItem> {
    serde_json::from_value::<GalleryItemResponse>(body.clone())
        .ok()?
        .into_gallery_item()
}
