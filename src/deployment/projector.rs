//! Projection of raw deployment responses into deployment records

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::models::{DeploymentMode, DeploymentVariable, ResourceGroupDeployment, TemplateLink};
use crate::error::{Result, RgDeployError};

/// Map a raw deployment status response into a [`ResourceGroupDeployment`].
///
/// Fields are read from `properties` first and from the top level second,
/// so both the full resource shape and a flattened one are accepted.
pub fn project(raw: &Value) -> Result<ResourceGroupDeployment> {
    let deployment_name = required_str(raw, "name")?.to_string();
    let resource_group_name = resource_group_of(raw)?;
    let provisioning_state = required_str(raw, "provisioningState")?.to_string();
    let correlation_id = required_str(raw, "correlationId")?.to_string();

    let timestamp = required_str(raw, "timestamp")?
        .parse::<DateTime<Utc>>()
        .map_err(|_| RgDeployError::malformed_response("timestamp"))?;

    let mode = required_str(raw, "mode")?
        .parse::<DeploymentMode>()
        .map_err(|_| RgDeployError::malformed_response("mode"))?;

    let template_link = match property(raw, "templateLink") {
        None | Some(Value::Null) => None,
        Some(link) => Some(
            serde_json::from_value::<TemplateLink>(link.clone())
                .map_err(|_| RgDeployError::malformed_response("templateLink"))?,
        ),
    };

    Ok(ResourceGroupDeployment {
        deployment_name,
        correlation_id,
        resource_group_name,
        provisioning_state,
        timestamp,
        mode,
        template_link,
        parameters: variables(raw, "parameters")?,
        outputs: variables(raw, "outputs")?,
    })
}

fn property<'a>(raw: &'a Value, key: &str) -> Option<&'a Value> {
    raw.get("properties")
        .and_then(|properties| properties.get(key))
        .or_else(|| raw.get(key))
}

fn required_str<'a>(raw: &'a Value, key: &str) -> Result<&'a str> {
    property(raw, key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| RgDeployError::malformed_response(key))
}

/// Resource group from the `id` path, falling back to a `resourceGroup` field
fn resource_group_of(raw: &Value) -> Result<String> {
    let from_id = raw.get("id").and_then(Value::as_str).and_then(|id| {
        let mut segments = id.split('/').filter(|segment| !segment.is_empty());
        segments
            .by_ref()
            .find(|segment| segment.eq_ignore_ascii_case("resourceGroups"))?;
        segments.next().map(str::to_string)
    });

    from_id
        .or_else(|| property(raw, "resourceGroup").and_then(Value::as_str).map(str::to_string))
        .filter(|name| !name.is_empty())
        .ok_or_else(|| RgDeployError::malformed_response("id"))
}

fn variables(raw: &Value, key: &str) -> Result<BTreeMap<String, DeploymentVariable>> {
    let entries = match property(raw, key) {
        None | Some(Value::Null) => return Ok(BTreeMap::new()),
        Some(Value::Object(entries)) => entries,
        Some(_) => return Err(RgDeployError::malformed_response(key)),
    };

    entries
        .iter()
        .map(|(name, entry)| -> Result<(String, DeploymentVariable)> {
            let variable = variable(entry).ok_or_else(|| {
                RgDeployError::malformed_response(format!("{}.{}", key, name))
            })?;
            Ok((name.clone(), variable))
        })
        .collect()
}

fn variable(entry: &Value) -> Option<DeploymentVariable> {
    let entry: &Map<String, Value> = entry.as_object()?;
    let value = entry.get("value").cloned().unwrap_or(Value::Null);
    let type_name = match entry.get("type").and_then(Value::as_str) {
        Some(type_name) => type_name.to_string(),
        None => inferred_type(&value).to_string(),
    };
    Some(DeploymentVariable { type_name, value })
}

fn inferred_type(value: &Value) -> &'static str {
    match value {
        Value::Bool(_) => "Bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "Int",
        Value::Number(_) => "Number",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
        Value::String(_) | Value::Null => "String",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response() -> Value {
        json!({
            "id": "/subscriptions/0000/resourceGroups/web-rg/providers/Microsoft.Resources/deployments/site",
            "name": "site",
            "properties": {
                "provisioningState": "Succeeded",
                "correlationId": "4f1c2e7a-0000-4000-8000-000000000001",
                "timestamp": "2024-03-01T10:15:30.1234567Z",
                "mode": "Incremental",
                "templateLink": {"uri": "https://example.com/t.json", "contentVersion": "1.0.0.0"},
                "parameters": {
                    "siteName": {"type": "String", "value": "contoso"},
                    "instances": {"type": "Int", "value": 3},
                    "alwaysOn": {"type": "Bool", "value": true},
                    "tags": {"type": "Object", "value": {"env": "prod"}},
                    "regions": {"type": "Array", "value": ["westus", "eastus"]}
                },
                "outputs": {
                    "endpoint": {"type": "String", "value": "https://contoso.example.com"}
                }
            }
        })
    }

    #[test]
    fn test_project_copies_fields() {
        let deployment = project(&response()).unwrap();

        assert_eq!(deployment.deployment_name, "site");
        assert_eq!(deployment.resource_group_name, "web-rg");
        assert_eq!(deployment.provisioning_state, "Succeeded");
        assert_eq!(deployment.correlation_id, "4f1c2e7a-0000-4000-8000-000000000001");
        assert_eq!(deployment.mode, DeploymentMode::Incremental);
        assert_eq!(
            deployment.template_link.as_ref().unwrap().content_version.as_deref(),
            Some("1.0.0.0")
        );
        assert_eq!(deployment.outputs["endpoint"].value, json!("https://contoso.example.com"));
        assert!(deployment.is_terminal());
    }

    #[test]
    fn test_serialized_values_parse_back() {
        let deployment = project(&response()).unwrap();

        for (name, text) in deployment.parameters_serialized() {
            let parsed = DeploymentVariable::parse_serialized(&text).unwrap();
            assert_eq!(parsed, deployment.parameters[&name].value, "parameter {}", name);
        }
        assert_eq!(deployment.parameters_serialized()["instances"], "3");
    }

    #[test]
    fn test_resource_group_falls_back_to_field() {
        let mut raw = response();
        raw.as_object_mut().unwrap().remove("id");
        raw["resourceGroup"] = json!("fallback-rg");

        assert_eq!(project(&raw).unwrap().resource_group_name, "fallback-rg");
    }

    #[test]
    fn test_missing_fields_are_reported() {
        for field in ["provisioningState", "correlationId", "timestamp", "mode"] {
            let mut raw = response();
            raw["properties"].as_object_mut().unwrap().remove(field);
            match project(&raw) {
                Err(RgDeployError::MalformedResponse { field: reported }) => assert_eq!(reported, field),
                other => panic!("expected MalformedResponse for {}, got {:?}", field, other),
            }
        }

        let mut raw = response();
        raw.as_object_mut().unwrap().remove("id");
        assert!(matches!(project(&raw), Err(RgDeployError::MalformedResponse { .. })));
    }

    #[test]
    fn test_unparsable_timestamp() {
        let mut raw = response();
        raw["properties"]["timestamp"] = json!("yesterday");
        assert!(matches!(
            project(&raw),
            Err(RgDeployError::MalformedResponse { field }) if field == "timestamp"
        ));
    }

    #[test]
    fn test_untyped_values_get_inferred_type() {
        let mut raw = response();
        raw["properties"]["outputs"] = json!({
            "count": {"value": 2},
            "ratio": {"value": 0.75},
            "enabled": {"value": true}
        });
        let deployment = project(&raw).unwrap();
        assert_eq!(deployment.outputs["count"].type_name, "Int");
        assert_eq!(deployment.outputs["ratio"].type_name, "Number");
        assert_eq!(deployment.outputs["enabled"].type_name, "Bool");
        assert!(deployment.template_link.is_some());
    }
}
