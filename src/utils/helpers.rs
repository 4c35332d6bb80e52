//! General utility helper functions
//!
//! Path resolution, name validation and default naming used by the
//! deployment commands.

use crate::error::{Result, RgDeployError};
use regex::Regex;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Check whether a template location is a remote `http(s)` URI
pub fn is_remote_uri(location: &str) -> bool {
    url::Url::parse(location)
        .map(|u| u.scheme() == "http" || u.scheme() == "https")
        .unwrap_or(false)
}

/// Resolve a user supplied path: expands a leading `~` and makes relative
/// paths absolute against the current directory.
pub fn resolve_path(path: &str) -> PathBuf {
    let expanded = if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    };

    if expanded.is_absolute() {
        expanded
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(&expanded))
            .unwrap_or(expanded)
    }
}

/// Generate a unique deployment name
pub fn generate_deployment_name() -> String {
    format!("deployment-{}", Uuid::new_v4())
}

/// Derive a deployment name from a template location (file stem of a path,
/// last URI segment, or gallery identity).
pub fn deployment_name_from_location(location: &str) -> Option<String> {
    let last_segment = if is_remote_uri(location) {
        url::Url::parse(location)
            .ok()?
            .path_segments()?
            .filter(|s| !s.is_empty())
            .last()?
            .to_string()
    } else {
        location.to_string()
    };

    let stem = Path::new(&last_segment)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())?;

    if validate_deployment_name(&stem).is_ok() {
        Some(stem)
    } else {
        None
    }
}

/// Validate a deployment name: 1-64 characters of letters, digits,
/// underscores, hyphens, periods and parentheses.
pub fn validate_deployment_name(name: &str) -> Result<()> {
    let re = Regex::new(r"^[-\w\.\(\)]{1,64}$")?;
    if re.is_match(name) {
        Ok(())
    } else {
        Err(RgDeployError::invalid_argument(format!(
            "Invalid deployment name '{}': use 1-64 letters, digits, '_', '-', '.', '(' or ')'",
            name
        )))
    }
}

/// Validate a resource group name
pub fn validate_resource_group_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(RgDeployError::invalid_argument("Resource group name cannot be empty"));
    }

    if name.chars().count() > 90 {
        return Err(RgDeployError::invalid_argument(
            "Resource group name cannot exceed 90 characters",
        ));
    }

    if name.ends_with('.') {
        return Err(RgDeployError::invalid_argument(
            "Resource group name cannot end with '.'",
        ));
    }

    let valid = name
        .chars()
        .all(|ch| ch.is_alphanumeric() || matches!(ch, '.' | '-' | '_' | '(' | ')'));
    if !valid {
        return Err(RgDeployError::invalid_argument(format!(
            "Invalid resource group name '{}'",
            name
        )));
    }

    Ok(())
}

/// Parse a single `key=value` pair
pub fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let pos = s
        .find('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{s}`"))?;
    let key = s[..pos].trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=value: empty key in `{s}`"));
    }
    Ok((key.to_string(), s[pos + 1..].to_string()))
}
