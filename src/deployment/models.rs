//! Deployment data models and types
//!
//! This module defines the deployment request submitted to Resource Manager
//! and the immutable deployment record projected from its responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tabled::{settings::Style, Table, Tabled};

use crate::template::models::ParameterValueSet;

/// Deployment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
pub enum DeploymentMode {
    #[default]
    Incremental,
    Complete,
}

impl FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "incremental" => Ok(DeploymentMode::Incremental),
            "complete" => Ok(DeploymentMode::Complete),
            other => Err(format!("unknown deployment mode '{other}'")),
        }
    }
}

impl fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeploymentMode::Incremental => f.write_str("Incremental"),
            DeploymentMode::Complete => f.write_str("Complete"),
        }
    }
}

/// Link to a template document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLink {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_version: Option<String>,
}

impl fmt::Display for TemplateLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.content_version {
            Some(version) => write!(f, "{} ({})", self.uri, version),
            None => f.write_str(&self.uri),
        }
    }
}

/// The template submitted with a deployment
#[derive(Debug, Clone, PartialEq)]
pub enum DeploymentTemplate {
    Link(TemplateLink),
    Inline(Value),
}

/// A fully resolved deployment request
#[derive(Debug, Clone)]
pub struct DeploymentRequest {
    pub resource_group: String,
    pub deployment_name: String,
    pub template: DeploymentTemplate,
    pub mode: DeploymentMode,
    parameters: ParameterValueSet,
}

impl DeploymentRequest {
    pub fn new(
        resource_group: String,
        deployment_name: String,
        template: DeploymentTemplate,
        mode: DeploymentMode,
        parameters: ParameterValueSet,
    ) -> Self {
        Self {
            resource_group,
            deployment_name,
            template,
            mode,
            parameters,
        }
    }

    pub fn parameters(&self) -> &ParameterValueSet {
        &self.parameters
    }

    /// Request body for the Resource Manager deployments API
    pub fn to_request_body(&self) -> Value {
        let mut properties = json!({
            "mode": self.mode.to_string(),
            "parameters": self.parameters.to_deployment_parameters(),
        });

        match &self.template {
            DeploymentTemplate::Link(link) => {
                properties["templateLink"] = json!(link);
            }
            DeploymentTemplate::Inline(template) => {
                properties["template"] = template.clone();
            }
        }

        json!({ "properties": properties })
    }
}

/// A parameter or output value of a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentVariable {
    #[serde(rename = "type")]
    pub type_name: String,
    pub value: Value,
}

impl DeploymentVariable {
    /// Stable JSON text of the value
    pub fn serialized(&self) -> String {
        serde_json::to_string(&self.value).unwrap_or_default()
    }

    /// Inverse of [`DeploymentVariable::serialized`]
    pub fn parse_serialized(text: &str) -> serde_json::Result<Value> {
        serde_json::from_str(text)
    }
}

/// Row used for the parameter and output tables
#[derive(Debug, Clone, Tabled)]
pub struct VariableRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Type")]
    pub type_name: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

fn display_template_link(link: &Option<TemplateLink>) -> String {
    match link {
        Some(link) => link.to_string(),
        None => "-".to_string(),
    }
}

/// Snapshot of a resource group deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Tabled)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupDeployment {
    #[tabled(rename = "Name")]
    pub deployment_name: String,
    #[tabled(skip)]
    pub correlation_id: String,
    #[tabled(rename = "Resource Group")]
    pub resource_group_name: String,
    #[tabled(rename = "State")]
    pub provisioning_state: String,
    #[tabled(rename = "Timestamp")]
    pub timestamp: DateTime<Utc>,
    #[tabled(rename = "Mode")]
    pub mode: DeploymentMode,
    #[tabled(rename = "Template Link", display_with = "display_template_link")]
    pub template_link: Option<TemplateLink>,
    #[tabled(skip)]
    pub parameters: BTreeMap<String, DeploymentVariable>,
    #[tabled(skip)]
    pub outputs: BTreeMap<String, DeploymentVariable>,
}

impl ResourceGroupDeployment {
    /// Terminal provisioning states
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.provisioning_state.to_lowercase().as_str(),
            "succeeded" | "failed" | "canceled"
        )
    }

    pub fn succeeded(&self) -> bool {
        self.provisioning_state.eq_ignore_ascii_case("succeeded")
    }

    /// Serialized-string form of every parameter value
    pub fn parameters_serialized(&self) -> BTreeMap<String, String> {
        serialize_variables(&self.parameters)
    }

    /// Serialized-string form of every output value
    pub fn outputs_serialized(&self) -> BTreeMap<String, String> {
        serialize_variables(&self.outputs)
    }

    /// Table rows for the parameters; secure values are masked
    pub fn parameter_rows(&self) -> Vec<VariableRow> {
        variable_rows(&self.parameters)
    }

    pub fn output_rows(&self) -> Vec<VariableRow> {
        variable_rows(&self.outputs)
    }

    /// Parameters rendered as a Name / Type / Value table, empty when there are none
    pub fn parameters_string(&self) -> String {
        render_rows(self.parameter_rows())
    }

    pub fn outputs_string(&self) -> String {
        render_rows(self.output_rows())
    }
}

fn render_rows(rows: Vec<VariableRow>) -> String {
    if rows.is_empty() {
        return String::new();
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    table.to_string()
}

/// Outcome of a validation request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationOutcome {
    /// Interpret a validation response; an `error` member means the template was rejected
    pub fn from_response(raw: &Value) -> Self {
        match raw.get("error").filter(|error| !error.is_null()) {
            Some(error) => Self {
                valid: false,
                message: Some(
                    super::operations::error_message(error)
                        .unwrap_or_else(|| error.to_string()),
                ),
            },
            None => Self {
                valid: true,
                message: None,
            },
        }
    }
}

fn serialize_variables(variables: &BTreeMap<String, DeploymentVariable>) -> BTreeMap<String, String> {
    variables
        .iter()
        .map(|(name, variable)| (name.clone(), variable.serialized()))
        .collect()
}

fn variable_rows(variables: &BTreeMap<String, DeploymentVariable>) -> Vec<VariableRow> {
    variables
        .iter()
        .map(|(name, variable)| {
            let secure = variable.type_name.to_lowercase().starts_with("secure");
            VariableRow {
                name: name.clone(),
                type_name: variable.type_name.clone(),
                value: if secure {
                    "********".to_string()
                } else {
                    variable.serialized()
                },
            }
        })
        .collect()
}
