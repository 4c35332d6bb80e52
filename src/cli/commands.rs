//! CLI commands and argument parsing
//!
//! This module defines the command-line interface structure using clap,
//! including all commands, subcommands, and their arguments.

use crate::auth::provider::{AuthProviderFactory, AzureAuthProvider};
use crate::blob::{BlobTemplateStager, DEFAULT_CONTAINER};
use crate::config::{Config, StagingConfig};
use crate::deployment::{
    AzureDeploymentOperations, DeployArgs, DeployOptions, DeploymentManager, DeploymentMode,
    ResourceGroupDeployment, TemplateArgs,
};
use crate::error::{Result, RgDeployError};
use crate::gallery::AzureGalleryClient;
use crate::template::fetcher::DefaultTemplateFetcher;
use crate::template::models::ParameterValueSet;
use crate::template::source::TemplateSourceArgs;
use crate::utils::cancel::CancellationSignal;
use crate::utils::format::{DisplayUtils, OutputFormat, TableFormatter};
use crate::utils::helpers::parse_key_val;
use crate::utils::interactive::TerminalPrompter;
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

/// Get the full version string with build information
fn get_version() -> &'static str {
    env!("VERSION_WITH_GIT")
}

/// Get build information for display
pub fn get_build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        git_hash: env!("GIT_HASH"),
        git_branch: env!("GIT_BRANCH"),
        build_time: env!("BUILD_TIME"),
        full_version: env!("VERSION_WITH_GIT"),
    }
}

#[derive(Debug)]
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub git_branch: &'static str,
    pub build_time: &'static str,
    pub full_version: &'static str,
}

#[derive(Parser)]
#[command(name = "rgd")]
#[command(about = "Deploy Azure Resource Manager templates into resource groups")]
#[command(version = get_version(), author)]
pub struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Template source and schema-independent parameter sources
#[derive(Args, Debug, Clone, Default)]
pub struct TemplateFlags {
    /// Identity of a template in the template gallery
    #[arg(long = "gallery-template", value_name = "IDENTITY")]
    pub gallery_template: Option<String>,

    /// Path of a local template file
    #[arg(long, value_name = "PATH")]
    pub template_file: Option<String>,

    /// URI of a remote template
    #[arg(long, value_name = "URI")]
    pub template_uri: Option<String>,

    /// Template parameters as a JSON object, e.g. '{"size":"Small"}'
    #[arg(long, value_name = "JSON")]
    pub template_parameter_object: Option<String>,

    /// Parameter file of the form {"name": {"value": ...}}
    #[arg(long, value_name = "PATH")]
    pub template_parameter_file: Option<PathBuf>,
}

impl TemplateFlags {
    pub fn to_template_args(&self) -> Result<TemplateArgs> {
        let inline_parameters = self
            .template_parameter_object
            .as_deref()
            .map(ParameterValueSet::parse_inline)
            .transpose()?;

        Ok(TemplateArgs {
            source: TemplateSourceArgs {
                gallery_template_identity: self.gallery_template.clone(),
                template_file: self.template_file.clone(),
                template_uri: self.template_uri.clone(),
            },
            inline_parameters,
            parameter_file: self.template_parameter_file.clone(),
        })
    }
}

/// Arguments shared by `deploy` and `validate`
#[derive(Args, Debug, Clone)]
pub struct DeploymentFlags {
    #[command(flatten)]
    pub template: TemplateFlags,

    /// Target resource group (defaults to the configured resource group)
    #[arg(short = 'g', long)]
    pub resource_group: Option<String>,

    /// Deployment name (defaults to the template name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Value for a template parameter, repeatable
    #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_key_val)]
    pub params: Vec<(String, String)>,

    /// Deployment mode (defaults to the configured mode)
    #[arg(long, value_enum)]
    pub mode: Option<DeploymentMode>,

    /// Content version of the linked template
    #[arg(long, value_name = "VERSION")]
    pub template_version: Option<String>,

    /// Storage account used to stage a local template file
    #[arg(long, value_name = "ACCOUNT")]
    pub storage_account: Option<String>,

    /// Never prompt for missing mandatory parameters
    #[arg(long)]
    pub no_prompt: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy a template into a resource group
    Deploy {
        #[command(flatten)]
        deployment: DeploymentFlags,

        /// Wait until the deployment finishes
        #[arg(long)]
        wait: bool,
    },
    /// Show the parameters a template still needs
    Parameters {
        #[command(flatten)]
        template: TemplateFlags,
    },
    /// Show a deployment
    Show {
        /// Deployment name
        name: String,
        #[arg(short = 'g', long)]
        resource_group: Option<String>,
    },
    /// List the deployments of a resource group (alias: ls)
    #[command(alias = "ls")]
    List {
        #[arg(short = 'g', long)]
        resource_group: Option<String>,
    },
    /// Cancel a running deployment
    Cancel {
        /// Deployment name
        name: String,
        #[arg(short = 'g', long)]
        resource_group: Option<String>,
    },
    /// Validate a deployment without running it
    Validate {
        #[command(flatten)]
        deployment: DeploymentFlags,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Show version and build information
    Version,
    /// Generate shell completions
    Completion {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },
    /// Show the configuration file path
    Path,
}

impl Commands {
    /// Config, version and completion commands run without a validated configuration
    pub fn needs_validated_config(&self) -> bool {
        !matches!(
            self,
            Commands::Config { .. } | Commands::Version | Commands::Completion { .. }
        )
    }
}

/// Output settings resolved from flags and configuration
struct Output {
    formatter: TableFormatter,
    display: DisplayUtils,
}

impl Output {
    fn new(format: OutputFormat, no_color: bool, config: &Config) -> Self {
        let format = if format == OutputFormat::Table && config.output_json {
            OutputFormat::Json
        } else {
            format
        };
        let no_color = no_color || config.no_color;

        Self {
            formatter: TableFormatter::new(format, no_color),
            display: DisplayUtils::new(no_color),
        }
    }

    fn structured(&self) -> bool {
        self.formatter.format() != OutputFormat::Table
    }
}

impl Cli {
    pub async fn execute(self, config: Config, cancel: CancellationSignal) -> Result<()> {
        let output = Output::new(self.format, self.no_color, &config);

        match self.command {
            Commands::Deploy { deployment, wait } => {
                execute_deploy(deployment, wait, &config, &output, &cancel).await
            }
            Commands::Parameters { template } => {
                execute_parameters(template, &config, &output, &cancel).await
            }
            Commands::Show {
                name,
                resource_group,
            } => execute_show(&name, resource_group, &config, &output, &cancel).await,
            Commands::List { resource_group } => {
                execute_list(resource_group, &config, &output, &cancel).await
            }
            Commands::Cancel {
                name,
                resource_group,
            } => execute_cancel(&name, resource_group, &config, &output, &cancel).await,
            Commands::Validate { deployment } => {
                execute_validate(deployment, &config, &output, &cancel).await
            }
            Commands::Config { command } => execute_config_command(command, config, &output).await,
            Commands::Version => execute_version_command(),
            Commands::Completion { shell } => execute_completion_command(shell),
        }
    }
}

/// Argument names of a subcommand, as template parameter names would spell them
pub fn bound_parameter_names(subcommand: &str) -> Vec<String> {
    let command = Cli::command();
    let globals = command.get_arguments();
    let own = command
        .find_subcommand(subcommand)
        .map(|sub| sub.get_arguments().collect::<Vec<_>>())
        .unwrap_or_default();

    globals
        .chain(own)
        .map(|arg| arg.get_id().as_str().replace('_', ""))
        .filter(|name| name != "help" && name != "version")
        .collect()
}

fn build_manager(
    config: &Config,
    storage_account: Option<String>,
    cancel: &CancellationSignal,
) -> Result<DeploymentManager> {
    let auth_provider: Arc<dyn AzureAuthProvider> = AuthProviderFactory::create_provider(config)?;

    let operations = AzureDeploymentOperations::new(
        auth_provider.clone(),
        config.management_endpoint.clone(),
        config.subscription_id.clone(),
        cancel.clone(),
    )?;
    let gallery = AzureGalleryClient::new(
        auth_provider.clone(),
        config.gallery_endpoint.clone(),
        config.management_endpoint.clone(),
    )?;
    let fetcher = DefaultTemplateFetcher::new()?;

    let mut manager = DeploymentManager::new(Arc::new(operations), Arc::new(gallery), Arc::new(fetcher))
        .with_bound_names(bound_parameter_names("deploy"))
        .with_prompter(Arc::new(TerminalPrompter::new()));

    let staging = match storage_account {
        Some(account) => Some(StagingConfig {
            storage_account: account,
            container_name: config
                .staging
                .as_ref()
                .map(|s| s.container_name.clone())
                .unwrap_or_else(|| DEFAULT_CONTAINER.to_string()),
        }),
        None => config.staging_config().cloned(),
    };
    if let Some(staging) = staging {
        manager = manager.with_stager(Arc::new(BlobTemplateStager::from_config(auth_provider, &staging)?));
    }

    Ok(manager)
}

fn deploy_args(flags: &DeploymentFlags, config: &Config) -> Result<DeployArgs> {
    Ok(DeployArgs {
        template: flags.template.to_template_args()?,
        resource_group: config.resolve_resource_group(flags.resource_group.clone())?,
        deployment_name: flags.name.clone(),
        bindings: flags.params.clone(),
        mode: flags.mode.unwrap_or(config.default_mode),
        template_version: flags.template_version.clone(),
    })
}

fn can_prompt(flags: &DeploymentFlags) -> bool {
    !flags.no_prompt && std::io::stdin().is_terminal()
}

async fn execute_deploy(
    flags: DeploymentFlags,
    wait: bool,
    config: &Config,
    output: &Output,
    cancel: &CancellationSignal,
) -> Result<()> {
    let args = deploy_args(&flags, config)?;
    let manager = build_manager(config, flags.storage_account.clone(), cancel)?;
    let options = DeployOptions {
        prompt: can_prompt(&flags),
        wait,
        poll_interval: config.poll_interval(),
        show_progress: !output.structured(),
    };

    let deployment = match manager.deploy(&args, &options, cancel).await {
        Ok(deployment) => deployment,
        Err(RgDeployError::Cancelled) if wait => {
            output.display.print_warning(
                "Stopped waiting. The deployment keeps running; use 'rgd cancel' to stop it.",
            );
            return Err(RgDeployError::Cancelled);
        }
        Err(e) => return Err(e),
    };

    print_deployment(&deployment, output)?;

    if wait && !deployment.succeeded() {
        return Err(RgDeployError::azure_api(format!(
            "Deployment '{}' finished as {}",
            deployment.deployment_name, deployment.provisioning_state
        )));
    }
    Ok(())
}

async fn execute_parameters(
    flags: TemplateFlags,
    config: &Config,
    output: &Output,
    cancel: &CancellationSignal,
) -> Result<()> {
    let args = flags.to_template_args()?;
    let manager = build_manager(config, None, cancel)?;
    let discovery = manager.parameters(&args, cancel).await?;

    if !output.structured() && discovery.parameters.is_empty() {
        output.display.print_info("All template parameters are already supplied");
        return Ok(());
    }

    println!("{}", output.formatter.format_table(&discovery.parameters)?);
    Ok(())
}

async fn execute_show(
    name: &str,
    resource_group: Option<String>,
    config: &Config,
    output: &Output,
    cancel: &CancellationSignal,
) -> Result<()> {
    let resource_group = config.resolve_resource_group(resource_group)?;
    let manager = build_manager(config, None, cancel)?;
    let deployment = manager.show(&resource_group, name, cancel).await?;
    print_deployment(&deployment, output)
}

async fn execute_list(
    resource_group: Option<String>,
    config: &Config,
    output: &Output,
    cancel: &CancellationSignal,
) -> Result<()> {
    let resource_group = config.resolve_resource_group(resource_group)?;
    let manager = build_manager(config, None, cancel)?;
    let deployments = manager.list(&resource_group, cancel).await?;

    println!("{}", output.formatter.format_table(&deployments)?);
    Ok(())
}

async fn execute_cancel(
    name: &str,
    resource_group: Option<String>,
    config: &Config,
    output: &Output,
    cancel: &CancellationSignal,
) -> Result<()> {
    let resource_group = config.resolve_resource_group(resource_group)?;
    let manager = build_manager(config, None, cancel)?;
    manager.cancel_deployment(&resource_group, name, cancel).await?;

    output.display.print_success(&format!(
        "Cancellation of deployment '{name}' in '{resource_group}' requested"
    ));
    Ok(())
}

async fn execute_validate(
    flags: DeploymentFlags,
    config: &Config,
    output: &Output,
    cancel: &CancellationSignal,
) -> Result<()> {
    let args = deploy_args(&flags, config)?;
    let manager = build_manager(config, flags.storage_account.clone(), cancel)?;
    let outcome = manager.validate(&args, can_prompt(&flags), cancel).await?;

    if output.structured() {
        println!("{}", output.formatter.format_value(&outcome)?);
    } else if outcome.valid {
        output.display.print_success("Template is valid");
    }

    if outcome.valid {
        Ok(())
    } else {
        Err(RgDeployError::azure_api(format!(
            "Template validation failed: {}",
            outcome.message.unwrap_or_default()
        )))
    }
}

fn print_deployment(deployment: &ResourceGroupDeployment, output: &Output) -> Result<()> {
    if output.structured() {
        println!("{}", output.formatter.format_value(deployment)?);
        return Ok(());
    }

    let timestamp = deployment.timestamp.to_rfc3339();
    let mode = deployment.mode.to_string();
    let template_link = deployment
        .template_link
        .as_ref()
        .map(|link| link.to_string())
        .unwrap_or_else(|| "-".to_string());

    output.display.print_header(&deployment.deployment_name);
    println!(
        "{}",
        output.display.format_key_value_pairs(&[
            ("Resource Group", deployment.resource_group_name.as_str()),
            ("State", deployment.provisioning_state.as_str()),
            ("Correlation ID", deployment.correlation_id.as_str()),
            ("Timestamp", timestamp.as_str()),
            ("Mode", mode.as_str()),
            ("Template Link", template_link.as_str()),
        ])
    );

    let parameters = deployment.parameters_string();
    if !parameters.is_empty() {
        println!();
        output.display.print_header("Parameters");
        println!("{parameters}");
    }

    let outputs = deployment.outputs_string();
    if !outputs.is_empty() {
        println!();
        output.display.print_header("Outputs");
        println!("{outputs}");
    }

    Ok(())
}

async fn execute_config_command(command: ConfigCommands, config: Config, output: &Output) -> Result<()> {
    match command {
        ConfigCommands::Show => execute_config_show(&config, output),
        ConfigCommands::Set { key, value } => execute_config_set(&key, &value, config, output).await,
        ConfigCommands::Path => execute_config_path(),
    }
}

fn execute_config_show(config: &Config, output: &Output) -> Result<()> {
    if output.structured() {
        println!("{}", output.formatter.format_value(config)?);
        return Ok(());
    }

    let not_set = |value: &str| {
        if value.is_empty() {
            "<not set>".to_string()
        } else {
            value.to_string()
        }
    };
    let staging = config.staging.clone().unwrap_or_default();

    let values = [
        ("debug", config.debug.to_string()),
        ("subscription_id", not_set(&config.subscription_id)),
        ("tenant_id", not_set(&config.tenant_id)),
        ("default_resource_group", not_set(&config.default_resource_group)),
        ("management_endpoint", config.management_endpoint.clone()),
        ("gallery_endpoint", config.gallery_endpoint.clone()),
        ("default_mode", config.default_mode.to_string()),
        ("poll_interval_secs", config.poll_interval_secs.to_string()),
        ("output_json", config.output_json.to_string()),
        ("no_color", config.no_color.to_string()),
        ("storage_account", not_set(&staging.storage_account)),
        ("storage_container", staging.container_name.clone()),
    ];
    let pairs: Vec<(&str, &str)> = values.iter().map(|(k, v)| (*k, v.as_str())).collect();

    output.display.print_header("Configuration");
    println!("{}", output.display.format_key_value_pairs(&pairs));
    Ok(())
}

async fn execute_config_set(key: &str, value: &str, mut config: Config, output: &Output) -> Result<()> {
    config.set_value(key, value)?;
    config.save().await?;

    output
        .display
        .print_success(&format!("Configuration updated: {key} = {value}"));
    Ok(())
}

fn execute_config_path() -> Result<()> {
    let config_path = Config::get_config_path()?;
    println!("{}", config_path.display());
    Ok(())
}

fn execute_version_command() -> Result<()> {
    let build_info = get_build_info();

    println!("rgd - Resource Group Deployment tool");
    println!("====================================");
    println!("Version:      {}", build_info.version);
    println!("Full Version: {}", build_info.full_version);
    println!("Git Hash:     {}", build_info.git_hash);
    println!("Git Branch:   {}", build_info.git_branch);
    println!("Built:        {}", build_info.build_time);

    Ok(())
}

fn execute_completion_command(shell: clap_complete::Shell) -> Result<()> {
    let mut command = Cli::command();
    clap_complete::generate(shell, &mut command, "rgd", &mut std::io::stdout());
    Ok(())
}
