//! Interactive input utilities
//!
//! Prompts for template parameters that are still missing after merging,
//! and a spinner for long-running operations.

use crate::error::{Result, RgDeployError};
use crate::template::models::{ParameterDescriptor, ParameterType};
use dialoguer::{theme::ColorfulTheme, Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::time::Duration;

/// Source of values for mandatory parameters nobody supplied
pub trait ParameterPrompter: Send + Sync {
    fn prompt(&self, descriptor: &ParameterDescriptor) -> Result<Value>;
}

/// Prompts on the controlling terminal
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl TerminalPrompter {
    pub fn new() -> Self {
        Self
    }

    fn label(descriptor: &ParameterDescriptor) -> String {
        if descriptor.help_message == descriptor.name {
            format!("{} ({})", descriptor.name, descriptor.parameter_type)
        } else {
            format!(
                "{} ({}) - {}",
                descriptor.name, descriptor.parameter_type, descriptor.help_message
            )
        }
    }

    fn select(&self, descriptor: &ParameterDescriptor, options: &[Value]) -> Result<Value> {
        let items: Vec<String> = options.iter().map(display_choice).collect();
        let index = Select::with_theme(&ColorfulTheme::default())
            .with_prompt(Self::label(descriptor))
            .items(&items)
            .default(0)
            .max_length(20)
            .interact()
            .map_err(|e| RgDeployError::invalid_argument(format!("Failed to get user selection: {e}")))?;

        Ok(options[index].clone())
    }
}

impl ParameterPrompter for TerminalPrompter {
    fn prompt(&self, descriptor: &ParameterDescriptor) -> Result<Value> {
        if !descriptor.allowed_values.is_empty() {
            return self.select(descriptor, &descriptor.allowed_values);
        }

        if descriptor.parameter_type == ParameterType::Bool {
            return self.select(descriptor, &[Value::Bool(true), Value::Bool(false)]);
        }

        if descriptor.parameter_type.is_secure() {
            let raw = rpassword::prompt_password(format!("{}: ", Self::label(descriptor)))?;
            return descriptor.coerce(&raw);
        }

        let raw = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(Self::label(descriptor))
            .validate_with(|input: &String| descriptor.coerce(input).map(|_| ()).map_err(|e| e.to_string()))
            .interact_text()
            .map_err(|e| RgDeployError::invalid_argument(format!("Failed to get user input: {e}")))?;

        descriptor.coerce(&raw)
    }
}

fn display_choice(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Progress indicator for long-running operations
pub struct ProgressIndicator {
    bar: ProgressBar,
}

impl ProgressIndicator {
    pub fn new(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.blue} {msg}")
        {
            bar.set_style(style);
        }
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar }
    }

    /// A spinner that draws nothing, for JSON/YAML output
    pub fn hidden() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    pub fn set_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    pub fn finish_success(&self, message: &str) {
        self.bar.finish_with_message(format!("✅ {message}"));
    }

    pub fn finish_error(&self, message: &str) {
        self.bar.finish_with_message(format!("❌ {message}"));
    }

    pub fn finish_clear(&self) {
        self.bar.finish_and_clear();
    }
}
