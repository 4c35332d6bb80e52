//! Parameter merging
//!
//! The final parameter set is layered, lowest precedence first:
//! inline parameter object, parameter file, values bound to discovered
//! parameters. A later layer overwrites an earlier one on the same name.

use serde_json::Value;
use std::path::Path;
use tracing::debug;

use super::models::{json_kind, ParameterDescriptor, ParameterValueSet};
use crate::error::{Result, RgDeployError};

/// Load a parameter file of the shape `{ "<name>": { "value": <any> } }`.
///
/// A full deployment parameters document (with `$schema` / `contentVersion`
/// and a nested `parameters` object) is accepted as well.
pub async fn load_parameter_file(path: &Path) -> Result<ParameterValueSet> {
    let location = path.display().to_string();

    match tokio::fs::try_exists(path).await {
        Ok(true) => {}
        Ok(false) => return Err(RgDeployError::parameter_file_not_found(location)),
        Err(e) => return Err(RgDeployError::parameter_file_invalid(&location, e)),
    }

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RgDeployError::parameter_file_invalid(&location, e))?;

    let document: Value = serde_json::from_str(&contents)
        .map_err(|e| RgDeployError::parameter_file_invalid(&location, e))?;

    let values = parse_parameter_document(&document)
        .map_err(|details| RgDeployError::parameter_file_invalid(&location, details))?;

    debug!(path = %location, count = values.len(), "loaded template parameter file");
    Ok(values)
}

fn parse_parameter_document(document: &Value) -> std::result::Result<ParameterValueSet, String> {
    let root = document
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, got {}", json_kind(document)))?;

    let is_deployment_document = root.contains_key("$schema") || root.contains_key("contentVersion");
    let entries = match root.get("parameters") {
        Some(Value::Object(inner)) if is_deployment_document => inner,
        _ => root,
    };

    let mut values = ParameterValueSet::new();
    for (name, entry) in entries {
        let value = entry
            .as_object()
            .and_then(|wrapper| wrapper.get("value"))
            .ok_or_else(|| format!("parameter '{name}' must be an object with a 'value' property"))?;
        values.insert(name.clone(), value.clone());
    }
    Ok(values)
}

/// Apply layers in order; later layers win on name collisions
pub fn merge_layers<'a, I>(layers: I) -> ParameterValueSet
where
    I: IntoIterator<Item = &'a ParameterValueSet>,
{
    let mut merged = ParameterValueSet::new();
    for layer in layers {
        merged.apply(layer);
    }
    merged
}

/// Produce the resolved parameter set for a deployment.
///
/// A missing `parameter_file` path means no file parameters; a path that does
/// not exist is `ParameterFileNotFound`.
pub async fn merge(
    inline: Option<&ParameterValueSet>,
    parameter_file: Option<&Path>,
    bindings: &ParameterValueSet,
) -> Result<ParameterValueSet> {
    let from_file = match parameter_file {
        Some(path) => Some(load_parameter_file(path).await?),
        None => None,
    };

    Ok(merge_layers(
        inline
            .into_iter()
            .chain(from_file.as_ref())
            .chain(std::iter::once(bindings)),
    ))
}

/// Turn raw `name=value` strings into typed values using the template schema
pub fn bind_parameters(
    schema: &[ParameterDescriptor],
    raw: &[(String, String)],
) -> Result<ParameterValueSet> {
    let mut bindings = ParameterValueSet::new();
    for (name, text) in raw {
        let descriptor = schema.iter().find(|d| d.is_named(name)).ok_or_else(|| {
            RgDeployError::invalid_parameter_value(name, "the template declares no such parameter")
        })?;
        bindings.insert(descriptor.name.clone(), descriptor.coerce(text)?);
    }
    Ok(bindings)
}

/// Fail on the first mandatory descriptor that has no resolved value
pub fn ensure_mandatory(descriptors: &[ParameterDescriptor], values: &ParameterValueSet) -> Result<()> {
    match descriptors
        .iter()
        .find(|d| d.mandatory && !values.contains(&d.name))
    {
        Some(missing) => Err(RgDeployError::missing_mandatory(&missing.name)),
        None => Ok(()),
    }
}
