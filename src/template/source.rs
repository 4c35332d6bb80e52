//! Template source selection
//!
//! A deployment takes its template from exactly one of a gallery identity,
//! a local file or a remote URI. Selection happens before any I/O.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, RgDeployError};

pub const GALLERY_TEMPLATE_IDENTITY: &str = "GalleryTemplateIdentity";
pub const TEMPLATE_FILE: &str = "TemplateFile";
pub const TEMPLATE_URI: &str = "TemplateUri";

/// The single active template source of a deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum TemplateSource {
    GalleryIdentity(String),
    LocalFile(String),
    RemoteUri(String),
}

impl TemplateSource {
    /// Name of the option that selected this source
    pub fn property_name(&self) -> &'static str {
        match self {
            TemplateSource::GalleryIdentity(_) => GALLERY_TEMPLATE_IDENTITY,
            TemplateSource::LocalFile(_) => TEMPLATE_FILE,
            TemplateSource::RemoteUri(_) => TEMPLATE_URI,
        }
    }

    /// The identity, path or URI
    pub fn location(&self) -> &str {
        match self {
            TemplateSource::GalleryIdentity(value)
            | TemplateSource::LocalFile(value)
            | TemplateSource::RemoteUri(value) => value,
        }
    }

    /// Whether this source differs from a previously seen one. Values are
    /// compared case-insensitively; a different kind of source always differs.
    pub fn differs_from(&self, previous: Option<&TemplateSource>) -> bool {
        let Some(previous) = previous else {
            return true;
        };

        match (self, previous) {
            (TemplateSource::GalleryIdentity(a), TemplateSource::GalleryIdentity(b))
            | (TemplateSource::LocalFile(a), TemplateSource::LocalFile(b))
            | (TemplateSource::RemoteUri(a), TemplateSource::RemoteUri(b)) => {
                a.to_lowercase() != b.to_lowercase()
            }
            _ => true,
        }
    }
}

impl fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.property_name(), self.location())
    }
}

/// Raw, possibly conflicting, template source options as supplied by a caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSourceArgs {
    pub gallery_template_identity: Option<String>,
    pub template_file: Option<String>,
    pub template_uri: Option<String>,
}

impl TemplateSourceArgs {
    pub fn gallery<S: Into<String>>(identity: S) -> Self {
        Self {
            gallery_template_identity: Some(identity.into()),
            ..Default::default()
        }
    }

    pub fn file<S: Into<String>>(path: S) -> Self {
        Self {
            template_file: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn uri<S: Into<String>>(uri: S) -> Self {
        Self {
            template_uri: Some(uri.into()),
            ..Default::default()
        }
    }

    /// Pick the single active source.
    ///
    /// Empty or whitespace-only values count as unset. More than one set value
    /// is `ConflictingSource`; none is `NoSource`.
    pub fn resolve(&self) -> Result<TemplateSource> {
        let set: Vec<TemplateSource> = [
            non_empty(&self.gallery_template_identity).map(TemplateSource::GalleryIdentity),
            non_empty(&self.template_file).map(TemplateSource::LocalFile),
            non_empty(&self.template_uri).map(TemplateSource::RemoteUri),
        ]
        .into_iter()
        .flatten()
        .collect();

        match set.as_slice() {
            [] => Err(RgDeployError::NoSource),
            [single] => Ok(single.clone()),
            many => Err(RgDeployError::conflicting_source(
                many.iter().map(|s| s.property_name()),
            )),
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
