//! Template parameter data models
//!
//! Parameter descriptors are built from a template's `parameters` section and
//! carry everything a caller needs to ask for, coerce and validate a value.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use tabled::Tabled;

use crate::error::{Result, RgDeployError};

/// Declared type of a template parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    SecureString,
    Int,
    Bool,
    Object,
    SecureObject,
    Array,
}

impl ParameterType {
    /// Values of secure types are never echoed or logged
    pub fn is_secure(&self) -> bool {
        matches!(self, ParameterType::SecureString | ParameterType::SecureObject)
    }
}

impl FromStr for ParameterType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" => Ok(ParameterType::String),
            "securestring" => Ok(ParameterType::SecureString),
            "int" => Ok(ParameterType::Int),
            "bool" => Ok(ParameterType::Bool),
            "object" => Ok(ParameterType::Object),
            "secureobject" => Ok(ParameterType::SecureObject),
            "array" => Ok(ParameterType::Array),
            other => Err(format!("unsupported parameter type '{other}'")),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterType::String => "string",
            ParameterType::SecureString => "securestring",
            ParameterType::Int => "int",
            ParameterType::Bool => "bool",
            ParameterType::Object => "object",
            ParameterType::SecureObject => "secureobject",
            ParameterType::Array => "array",
        };
        f.write_str(name)
    }
}

fn display_default(value: &Option<Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "-".to_string(),
    }
}

/// A named, typed parameter declared by a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
pub struct ParameterDescriptor {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    pub parameter_type: ParameterType,
    #[tabled(rename = "Mandatory")]
    pub mandatory: bool,
    #[tabled(rename = "Help")]
    pub help_message: String,
    #[tabled(rename = "Default", display_with = "display_default")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[tabled(skip)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Value>,
}

impl ParameterDescriptor {
    /// Build a descriptor from one entry of a template `parameters` section
    pub fn from_declaration(name: &str, declaration: &Value) -> std::result::Result<Self, String> {
        let declaration = declaration
            .as_object()
            .ok_or_else(|| format!("parameter '{name}' must be an object"))?;

        let parameter_type = declaration
            .get("type")
            .and_then(|t| t.as_str())
            .ok_or_else(|| format!("parameter '{name}' has no type"))?
            .parse::<ParameterType>()
            .map_err(|e| format!("parameter '{name}': {e}"))?;

        let default_value = declaration.get("defaultValue").cloned();

        let help_message = declaration
            .get("metadata")
            .and_then(|m| m.get("description"))
            .and_then(|d| d.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| name.to_string());

        let allowed_values = declaration
            .get("allowedValues")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            name: name.to_string(),
            parameter_type,
            mandatory: default_value.is_none(),
            help_message,
            default_value,
            allowed_values,
        })
    }

    /// Whether this descriptor is addressed by `name` (case-insensitive)
    pub fn is_named(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }

    /// Convert a raw command-line string into a value of the declared type
    pub fn coerce(&self, raw: &str) -> Result<Value> {
        let value = match self.parameter_type {
            ParameterType::String | ParameterType::SecureString => Value::String(raw.to_string()),
            ParameterType::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| {
                    RgDeployError::invalid_parameter_value(&self.name, format!("'{raw}' is not an integer"))
                })?,
            ParameterType::Bool => match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Value::Bool(true),
                "false" | "0" | "no" => Value::Bool(false),
                _ => {
                    return Err(RgDeployError::invalid_parameter_value(
                        &self.name,
                        format!("'{raw}' is not a boolean"),
                    ))
                }
            },
            ParameterType::Object | ParameterType::SecureObject => {
                let parsed: Value = serde_json::from_str(raw).map_err(|e| {
                    RgDeployError::invalid_parameter_value(&self.name, format!("expected a JSON object: {e}"))
                })?;
                if !parsed.is_object() {
                    return Err(RgDeployError::invalid_parameter_value(
                        &self.name,
                        "expected a JSON object",
                    ));
                }
                parsed
            }
            ParameterType::Array => {
                let parsed: Value = serde_json::from_str(raw).map_err(|e| {
                    RgDeployError::invalid_parameter_value(&self.name, format!("expected a JSON array: {e}"))
                })?;
                if !parsed.is_array() {
                    return Err(RgDeployError::invalid_parameter_value(
                        &self.name,
                        "expected a JSON array",
                    ));
                }
                parsed
            }
        };

        self.check_allowed(&value)?;
        Ok(value)
    }

    /// Check a value against the declared `allowedValues`, if any.
    /// String comparison is case-insensitive.
    pub fn check_allowed(&self, value: &Value) -> Result<()> {
        if self.allowed_values.is_empty() {
            return Ok(());
        }

        let allowed = self.allowed_values.iter().any(|candidate| match (candidate, value) {
            (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
            (a, b) => a == b,
        });

        if allowed {
            Ok(())
        } else {
            let choices: Vec<String> = self.allowed_values.iter().map(|v| v.to_string()).collect();
            Err(RgDeployError::invalid_parameter_value(
                &self.name,
                format!("value must be one of {}", choices.join(", ")),
            ))
        }
    }
}

/// Extract the parameter descriptors declared by a template body.
///
/// The body must be a JSON object with a `parameters` object; descriptors
/// keep the declaration order.
pub fn parse_template_parameters(template: &Value) -> std::result::Result<Vec<ParameterDescriptor>, String> {
    let template = template
        .as_object()
        .ok_or_else(|| "template must be a JSON object".to_string())?;

    let parameters = template
        .get("parameters")
        .ok_or_else(|| "template has no parameters section".to_string())?
        .as_object()
        .ok_or_else(|| "template parameters section must be an object".to_string())?;

    parameters
        .iter()
        .map(|(name, declaration)| ParameterDescriptor::from_declaration(name, declaration))
        .collect()
}

/// Ordered mapping of parameter name to resolved value.
///
/// Names are matched case-insensitively: assigning to an existing name
/// replaces its value and keeps the original spelling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterValueSet {
    values: Map<String, Value>,
}

impl ParameterValueSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a JSON object of plain `name: value` pairs
    pub fn from_json_object(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => {
                let mut set = Self::new();
                for (name, value) in map {
                    set.insert(name, value);
                }
                Ok(set)
            }
            other => Err(RgDeployError::invalid_argument(format!(
                "Template parameter object must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Parse an inline parameter object from its JSON text
    pub fn parse_inline(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text).map_err(|e| {
            RgDeployError::invalid_argument(format!("Template parameter object is not valid JSON: {e}"))
        })?;
        Self::from_json_object(value)
    }

    fn key_for(&self, name: &str) -> Option<String> {
        let lowered = name.to_lowercase();
        self.values.keys().find(|k| k.to_lowercase() == lowered).cloned()
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, value: Value) {
        let name = name.into();
        match self.key_for(&name) {
            Some(existing) => {
                self.values.insert(existing, value);
            }
            None => {
                self.values.insert(name, value);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.key_for(name).and_then(|k| self.values.get(&k))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.key_for(name).is_some()
    }

    /// Apply every entry of `other` on top of this set
    pub fn apply(&mut self, other: &ParameterValueSet) {
        for (name, value) in other.iter() {
            self.insert(name.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Render in the deployment wire shape `{ "<name>": { "value": <any> } }`
    pub fn to_deployment_parameters(&self) -> Value {
        let wrapped: Map<String, Value> = self
            .values
            .iter()
            .map(|(name, value)| {
                let mut entry = Map::new();
                entry.insert("value".to_string(), value.clone());
                (name.clone(), Value::Object(entry))
            })
            .collect();
        Value::Object(wrapped)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
