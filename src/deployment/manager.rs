//! Deployment management facade
//!
//! This module ties template resolution, parameter discovery and merging,
//! template staging and the deployment operations together into the flows
//! the CLI exposes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::models::{
    DeploymentMode, DeploymentRequest, DeploymentTemplate, ResourceGroupDeployment, TemplateLink,
    ValidationOutcome,
};
use super::operations::DeploymentOperations;
use super::projector::project;
use crate::blob::TemplateStager;
use crate::error::Result;
use crate::gallery::GalleryClient;
use crate::template::discovery::{Discovery, DiscoveryRequest, FetchedTemplate, ParameterDiscoverer};
use crate::template::fetcher::TemplateFetcher;
use crate::template::models::{ParameterDescriptor, ParameterValueSet};
use crate::template::parameters::{bind_parameters, ensure_mandatory, merge_layers};
use crate::template::source::{TemplateSource, TemplateSourceArgs};
use crate::utils::cancel::CancellationSignal;
use crate::utils::helpers::{
    deployment_name_from_location, generate_deployment_name, validate_deployment_name,
    validate_resource_group_name,
};
use crate::utils::interactive::{ParameterPrompter, ProgressIndicator};

/// Template selection plus the parameter sources that do not depend on the schema
#[derive(Debug, Clone, Default)]
pub struct TemplateArgs {
    pub source: TemplateSourceArgs,
    pub inline_parameters: Option<ParameterValueSet>,
    pub parameter_file: Option<PathBuf>,
}

/// Everything needed to build one deployment request
#[derive(Debug, Clone, Default)]
pub struct DeployArgs {
    pub template: TemplateArgs,
    pub resource_group: String,
    pub deployment_name: Option<String>,
    /// Raw `name=value` pairs for discovered parameters
    pub bindings: Vec<(String, String)>,
    pub mode: DeploymentMode,
    pub template_version: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
    /// Ask for mandatory parameters that are still missing
    pub prompt: bool,
    /// Poll until the deployment reaches a terminal state
    pub wait: bool,
    pub poll_interval: Duration,
    pub show_progress: bool,
}

impl Default for DeployOptions {
    fn default() -> Self {
        Self {
            prompt: false,
            wait: false,
            poll_interval: Duration::from_secs(5),
            show_progress: false,
        }
    }
}

/// High-level deployment manager
pub struct DeploymentManager {
    operations: Arc<dyn DeploymentOperations>,
    discoverer: ParameterDiscoverer,
    stager: Option<Arc<dyn TemplateStager>>,
    prompter: Option<Arc<dyn ParameterPrompter>>,
    bound_names: Vec<String>,
}

impl DeploymentManager {
    pub fn new(
        operations: Arc<dyn DeploymentOperations>,
        gallery: Arc<dyn GalleryClient>,
        fetcher: Arc<dyn TemplateFetcher>,
    ) -> Self {
        Self {
            operations,
            discoverer: ParameterDiscoverer::new(gallery, fetcher),
            stager: None,
            prompter: None,
            bound_names: Vec::new(),
        }
    }

    /// Stage local templates through `stager` instead of sending them inline
    pub fn with_stager(mut self, stager: Arc<dyn TemplateStager>) -> Self {
        self.stager = Some(stager);
        self
    }

    pub fn with_prompter(mut self, prompter: Arc<dyn ParameterPrompter>) -> Self {
        self.prompter = Some(prompter);
        self
    }

    /// Names owned by the calling command; never reported as discovered parameters
    pub fn with_bound_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bound_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Discover the parameters a template still needs
    pub async fn parameters(&self, args: &TemplateArgs, cancel: &CancellationSignal) -> Result<Discovery> {
        let source = args.source.resolve()?;
        self.discover(args, &source, cancel).await
    }

    /// Resolve, merge and submit a deployment
    pub async fn deploy(
        &self,
        args: &DeployArgs,
        options: &DeployOptions,
        cancel: &CancellationSignal,
    ) -> Result<ResourceGroupDeployment> {
        let request = self.prepare(args, options.prompt, cancel).await?;

        let raw = cancel.run(self.operations.submit(&request)).await?;
        let deployment = project(&raw)?;
        info!(
            deployment = %deployment.deployment_name,
            state = %deployment.provisioning_state,
            "deployment submitted"
        );

        if !options.wait || deployment.is_terminal() {
            return Ok(deployment);
        }

        let progress = if options.show_progress {
            ProgressIndicator::new(&format!(
                "Deployment '{}' is {}",
                deployment.deployment_name, deployment.provisioning_state
            ))
        } else {
            ProgressIndicator::hidden()
        };

        let result = self
            .wait_for_completion(
                &request.resource_group,
                &request.deployment_name,
                options.poll_interval,
                &progress,
                cancel,
            )
            .await;

        match &result {
            Ok(done) if done.succeeded() => progress.finish_success(&format!(
                "Deployment '{}' succeeded",
                done.deployment_name
            )),
            Ok(done) => progress.finish_error(&format!(
                "Deployment '{}' finished as {}",
                done.deployment_name, done.provisioning_state
            )),
            Err(_) => progress.finish_clear(),
        }

        result
    }

    /// Build the request and ask Resource Manager whether it would be accepted
    pub async fn validate(
        &self,
        args: &DeployArgs,
        prompt: bool,
        cancel: &CancellationSignal,
    ) -> Result<ValidationOutcome> {
        let request = self.prepare(args, prompt, cancel).await?;
        let raw = cancel.run(self.operations.validate(&request)).await?;
        Ok(ValidationOutcome::from_response(&raw))
    }

    pub async fn show(
        &self,
        resource_group: &str,
        deployment_name: &str,
        cancel: &CancellationSignal,
    ) -> Result<ResourceGroupDeployment> {
        validate_resource_group_name(resource_group)?;
        validate_deployment_name(deployment_name)?;

        let raw = cancel
            .run(self.operations.get_status(resource_group, deployment_name))
            .await?;
        project(&raw)
    }

    /// List deployments of a resource group, newest first
    pub async fn list(
        &self,
        resource_group: &str,
        cancel: &CancellationSignal,
    ) -> Result<Vec<ResourceGroupDeployment>> {
        validate_resource_group_name(resource_group)?;

        let raw = cancel.run(self.operations.list(resource_group)).await?;
        let mut deployments: Vec<ResourceGroupDeployment> = raw
            .iter()
            .filter_map(|value| match project(value) {
                Ok(deployment) => Some(deployment),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable deployment entry");
                    None
                }
            })
            .collect();

        deployments.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(deployments)
    }

    pub async fn cancel_deployment(
        &self,
        resource_group: &str,
        deployment_name: &str,
        cancel: &CancellationSignal,
    ) -> Result<()> {
        validate_resource_group_name(resource_group)?;
        validate_deployment_name(deployment_name)?;

        cancel
            .run(self.operations.cancel(resource_group, deployment_name))
            .await
    }

    /// Poll until the deployment reaches Succeeded, Failed or Canceled
    pub async fn wait_for_completion(
        &self,
        resource_group: &str,
        deployment_name: &str,
        poll_interval: Duration,
        progress: &ProgressIndicator,
        cancel: &CancellationSignal,
    ) -> Result<ResourceGroupDeployment> {
        loop {
            cancel
                .run(async {
                    tokio::time::sleep(poll_interval).await;
                    Ok(())
                })
                .await?;

            let deployment = self.show(resource_group, deployment_name, cancel).await?;
            debug!(
                deployment = deployment_name,
                state = %deployment.provisioning_state,
                "polled deployment"
            );

            if deployment.is_terminal() {
                return Ok(deployment);
            }

            progress.set_message(&format!(
                "Deployment '{}' is {}",
                deployment_name, deployment.provisioning_state
            ));
        }
    }

    async fn discover(
        &self,
        args: &TemplateArgs,
        source: &TemplateSource,
        cancel: &CancellationSignal,
    ) -> Result<Discovery> {
        let request = DiscoveryRequest {
            source,
            inline: args.inline_parameters.as_ref(),
            parameter_file: args.parameter_file.as_deref(),
            already_bound: &self.bound_names,
        };
        self.discoverer.discover(request, None, cancel).await
    }

    /// Resolve the source, merge every parameter layer and build the request
    async fn prepare(
        &self,
        args: &DeployArgs,
        prompt: bool,
        cancel: &CancellationSignal,
    ) -> Result<DeploymentRequest> {
        let source = args.template.source.resolve()?;

        validate_resource_group_name(&args.resource_group)?;
        let deployment_name = match &args.deployment_name {
            Some(name) => name.clone(),
            None => default_deployment_name(&source),
        };
        validate_deployment_name(&deployment_name)?;

        let discovery = self.discover(&args.template, &source, cancel).await?;
        let bindings = bind_parameters(discovery.schema(), &args.bindings)?;

        let mut parameters = merge_layers(
            args.template
                .inline_parameters
                .iter()
                .chain(discovery.file_parameters.as_ref())
                .chain(std::iter::once(&bindings)),
        );

        if prompt {
            if let Some(prompter) = &self.prompter {
                prompt_missing(prompter.as_ref(), discovery.schema(), &mut parameters)?;
            }
        }

        ensure_mandatory(discovery.schema(), &parameters)?;

        let template = self
            .template_for(&source, discovery.template(), args.template_version.as_deref(), cancel)
            .await?;

        Ok(DeploymentRequest::new(
            args.resource_group.clone(),
            deployment_name,
            template,
            args.mode,
            parameters,
        ))
    }

    /// Deployment template for a source, built from what discovery fetched
    async fn template_for(
        &self,
        source: &TemplateSource,
        fetched: &FetchedTemplate,
        template_version: Option<&str>,
        cancel: &CancellationSignal,
    ) -> Result<DeploymentTemplate> {
        let content_version = template_version.map(str::to_string);

        match (source, fetched) {
            (_, FetchedTemplate::Gallery(item)) => Ok(DeploymentTemplate::Link(TemplateLink {
                uri: item.template_uri.clone(),
                content_version,
            })),
            (TemplateSource::RemoteUri(uri), _) => Ok(DeploymentTemplate::Link(TemplateLink {
                uri: uri.clone(),
                content_version,
            })),
            (_, FetchedTemplate::Document(template)) => match &self.stager {
                Some(stager) => {
                    let content = serde_json::to_vec(template)?;
                    let link = cancel.run(stager.stage(source.location(), content)).await?;
                    Ok(DeploymentTemplate::Link(TemplateLink {
                        content_version,
                        ..link
                    }))
                }
                None => {
                    if content_version.is_some() {
                        warn!(path = %source.location(), "template version is ignored for inline templates");
                    }
                    Ok(DeploymentTemplate::Inline(template.clone()))
                }
            },
        }
    }
}

/// Ask for every mandatory parameter without a value
fn prompt_missing(
    prompter: &dyn ParameterPrompter,
    schema: &[ParameterDescriptor],
    parameters: &mut ParameterValueSet,
) -> Result<()> {
    let missing: Vec<&ParameterDescriptor> = schema
        .iter()
        .filter(|descriptor| descriptor.mandatory && !parameters.contains(&descriptor.name))
        .collect();

    for descriptor in missing {
        let value = prompter.prompt(descriptor)?;
        parameters.insert(descriptor.name.clone(), value);
    }
    Ok(())
}

/// Template file stem, URI file stem or gallery identity, else a generated name
pub fn default_deployment_name(source: &TemplateSource) -> String {
    let derived = match source {
        TemplateSource::GalleryIdentity(identity) => validate_deployment_name(identity)
            .ok()
            .map(|_| identity.clone()),
        TemplateSource::LocalFile(location) | TemplateSource::RemoteUri(location) => {
            deployment_name_from_location(location)
        }
    };

    derived.unwrap_or_else(generate_deployment_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::MockTemplateStager;
    use crate::deployment::operations::MockDeploymentOperations;
    use crate::error::RgDeployError;
    use crate::gallery::{GalleryItem, MockGalleryClient};
    use crate::template::fetcher::MockTemplateFetcher;
    use crate::utils::cancel::cancellation_pair;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const TEMPLATE: &str = r#"{
        "parameters": {
            "size": {"type": "string", "allowedValues": ["Small", "Large"]},
            "count": {"type": "int", "defaultValue": 1},
            "mode": {"type": "string", "defaultValue": "fast"}
        },
        "resources": []
    }"#;

    fn deployment_response(state: &str) -> Value {
        json!({
            "id": "/subscriptions/0000/resourceGroups/web-rg/providers/Microsoft.Resources/deployments/site",
            "name": "site",
            "properties": {
                "provisioningState": state,
                "correlationId": "c0ffee00-0000-4000-8000-000000000000",
                "timestamp": "2024-03-01T10:15:30Z",
                "mode": "Incremental",
                "parameters": {"size": {"type": "String", "value": "Small"}}
            }
        })
    }

    fn template_fetcher() -> MockTemplateFetcher {
        let mut fetcher = MockTemplateFetcher::new();
        fetcher
            .expect_read()
            .returning(|_| Ok(TEMPLATE.as_bytes().to_vec()));
        fetcher
    }

    fn manager(operations: MockDeploymentOperations) -> DeploymentManager {
        DeploymentManager::new(
            Arc::new(operations),
            Arc::new(MockGalleryClient::new()),
            Arc::new(template_fetcher()),
        )
    }

    fn file_args(bindings: &[(&str, &str)]) -> DeployArgs {
        DeployArgs {
            template: TemplateArgs {
                source: TemplateSourceArgs::file("site.json"),
                ..TemplateArgs::default()
            },
            resource_group: "web-rg".to_string(),
            bindings: bindings
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            ..DeployArgs::default()
        }
    }

    struct FixedPrompter {
        calls: AtomicUsize,
    }

    impl ParameterPrompter for FixedPrompter {
        fn prompt(&self, descriptor: &ParameterDescriptor) -> Result<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            descriptor.coerce("Large")
        }
    }

    #[tokio::test]
    async fn test_deploy_submits_merged_parameters_inline() {
        let mut operations = MockDeploymentOperations::new();
        operations
            .expect_submit()
            .withf(|request| {
                request.deployment_name == "site"
                    && request.parameters().get("size") == Some(&json!("Small"))
                    && request.parameters().get("count") == Some(&json!(4))
                    && matches!(request.template, DeploymentTemplate::Inline(_))
            })
            .times(1)
            .returning(|_| Ok(deployment_response("Running")));

        let args = file_args(&[("size", "Small"), ("COUNT", "4")]);
        let deployment = manager(operations)
            .deploy(&args, &DeployOptions::default(), &CancellationSignal::never())
            .await
            .unwrap();

        assert_eq!(deployment.deployment_name, "site");
        assert_eq!(deployment.provisioning_state, "Running");
    }

    #[tokio::test]
    async fn test_local_template_is_read_once_per_deployment() {
        let mut fetcher = MockTemplateFetcher::new();
        fetcher
            .expect_read()
            .times(1)
            .returning(|_| Ok(TEMPLATE.as_bytes().to_vec()));

        let mut operations = MockDeploymentOperations::new();
        operations
            .expect_submit()
            .withf(|request| {
                matches!(
                    &request.template,
                    DeploymentTemplate::Inline(body) if body["parameters"]["size"]["type"] == "string"
                )
            })
            .times(1)
            .returning(|_| Ok(deployment_response("Accepted")));

        let manager = DeploymentManager::new(
            Arc::new(operations),
            Arc::new(MockGalleryClient::new()),
            Arc::new(fetcher),
        );
        manager
            .deploy(&file_args(&[("size", "Small")]), &DeployOptions::default(), &CancellationSignal::never())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_parameter_file_values_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let parameter_file = dir.path().join("site.parameters.json");
        std::fs::write(&parameter_file, r#"{"size": {"value": "Large"}, "count": {"value": 2}}"#).unwrap();

        let mut operations = MockDeploymentOperations::new();
        operations
            .expect_submit()
            .withf(|request| {
                request.parameters().get("size") == Some(&json!("Large"))
                    && request.parameters().get("count") == Some(&json!(7))
            })
            .times(1)
            .returning(|_| Ok(deployment_response("Accepted")));

        let mut args = file_args(&[("count", "7")]);
        args.template.parameter_file = Some(parameter_file);

        manager(operations)
            .deploy(&args, &DeployOptions::default(), &CancellationSignal::never())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_missing_mandatory_parameter_blocks_submission() {
        let mut operations = MockDeploymentOperations::new();
        operations.expect_submit().never();

        let result = manager(operations)
            .deploy(&file_args(&[]), &DeployOptions::default(), &CancellationSignal::never())
            .await;

        assert!(matches!(
            result,
            Err(RgDeployError::MissingMandatoryParameter { name }) if name == "size"
        ));
    }

    #[tokio::test]
    async fn test_prompt_fills_missing_mandatory_parameter() {
        let mut operations = MockDeploymentOperations::new();
        operations
            .expect_submit()
            .withf(|request| request.parameters().get("size") == Some(&json!("Large")))
            .times(1)
            .returning(|_| Ok(deployment_response("Succeeded")));

        let prompter = Arc::new(FixedPrompter {
            calls: AtomicUsize::new(0),
        });
        let manager = manager(operations).with_prompter(prompter.clone());
        let options = DeployOptions {
            prompt: true,
            ..DeployOptions::default()
        };

        manager
            .deploy(&file_args(&[]), &options, &CancellationSignal::never())
            .await
            .unwrap();
        assert_eq!(prompter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_bound_names_are_not_discovered() {
        let manager = manager(MockDeploymentOperations::new()).with_bound_names(["Mode", "ResourceGroup"]);
        let args = file_args(&[]);

        let discovery = manager
            .parameters(&args.template, &CancellationSignal::never())
            .await
            .unwrap();

        let names: Vec<&str> = discovery.parameters.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["size", "count"]);
        assert_eq!(discovery.schema().len(), 3);
    }

    #[tokio::test]
    async fn test_conflicting_source_fails_before_io() {
        let mut operations = MockDeploymentOperations::new();
        operations.expect_submit().never();
        let mut fetcher = MockTemplateFetcher::new();
        fetcher.expect_read().never();

        let manager = DeploymentManager::new(
            Arc::new(operations),
            Arc::new(MockGalleryClient::new()),
            Arc::new(fetcher),
        );
        let mut args = file_args(&[("size", "Small")]);
        args.template.source.template_uri = Some("https://example.com/site.json".to_string());

        let result = manager
            .deploy(&args, &DeployOptions::default(), &CancellationSignal::never())
            .await;
        assert!(matches!(result, Err(RgDeployError::ConflictingSource { .. })));
    }

    #[tokio::test]
    async fn test_local_template_is_staged_when_stager_configured() {
        let mut stager = MockTemplateStager::new();
        stager.expect_stage().times(1).returning(|_, _| {
            Ok(TemplateLink {
                uri: "https://acct.blob.core.windows.net/templates/abc.json".to_string(),
                content_version: None,
            })
        });

        let mut operations = MockDeploymentOperations::new();
        operations
            .expect_submit()
            .withf(|request| {
                matches!(
                    &request.template,
                    DeploymentTemplate::Link(link)
                        if link.uri.ends_with("/templates/abc.json")
                            && link.content_version.as_deref() == Some("1.0.0.0")
                )
            })
            .times(1)
            .returning(|_| Ok(deployment_response("Accepted")));

        let mut args = file_args(&[("size", "Small")]);
        args.template_version = Some("1.0.0.0".to_string());

        manager(operations)
            .with_stager(Arc::new(stager))
            .deploy(&args, &DeployOptions::default(), &CancellationSignal::never())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_gallery_template_links_item_uri() {
        let mut gallery = MockGalleryClient::new();
        gallery.expect_get_gallery_item().times(1).returning(|identity| {
            Ok(GalleryItem {
                identity: identity.to_string(),
                display_name: "Website".to_string(),
                publisher: "Microsoft".to_string(),
                version: "0.1.0".to_string(),
                template_uri: "https://gallery.example.com/website.json".to_string(),
            })
        });
        gallery.expect_get_template_body().times(1).returning(|_| {
            Ok(json!({"parameters": {"siteName": {"type": "string", "defaultValue": "contoso"}}}))
        });

        let mut operations = MockDeploymentOperations::new();
        operations
            .expect_submit()
            .withf(|request| {
                request.deployment_name == "Microsoft.WebSite.0.1.0"
                    && request.template
                        == DeploymentTemplate::Link(TemplateLink {
                            uri: "https://gallery.example.com/website.json".to_string(),
                            content_version: None,
                        })
            })
            .times(1)
            .returning(|_| Ok(deployment_response("Accepted")));

        let manager = DeploymentManager::new(
            Arc::new(operations),
            Arc::new(gallery),
            Arc::new(MockTemplateFetcher::new()),
        );
        let args = DeployArgs {
            template: TemplateArgs {
                source: TemplateSourceArgs::gallery("Microsoft.WebSite.0.1.0"),
                ..TemplateArgs::default()
            },
            resource_group: "web-rg".to_string(),
            ..DeployArgs::default()
        };

        manager
            .deploy(&args, &DeployOptions::default(), &CancellationSignal::never())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_polls_until_terminal() {
        let polls = Arc::new(AtomicUsize::new(0));
        let mut operations = MockDeploymentOperations::new();
        operations
            .expect_submit()
            .returning(|_| Ok(deployment_response("Accepted")));
        let counter = polls.clone();
        operations.expect_get_status().returning(move |_, _| {
            let state = if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                "Running"
            } else {
                "Succeeded"
            };
            Ok(deployment_response(state))
        });

        let options = DeployOptions {
            wait: true,
            poll_interval: Duration::from_millis(1),
            ..DeployOptions::default()
        };
        let deployment = manager(operations)
            .deploy(&file_args(&[("size", "Small")]), &options, &CancellationSignal::never())
            .await
            .unwrap();

        assert!(deployment.succeeded());
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_wait_honours_cancellation() {
        let mut operations = MockDeploymentOperations::new();
        operations
            .expect_get_status()
            .returning(|_, _| Ok(deployment_response("Running")));

        let (handle, signal) = cancellation_pair();
        let manager = manager(operations);
        let progress = ProgressIndicator::hidden();
        let waiting = manager.wait_for_completion(
            "web-rg",
            "site",
            Duration::from_millis(5),
            &progress,
            &signal,
        );

        let cancel_later = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            handle.cancel();
        };

        let (result, _) = tokio::join!(waiting, cancel_later);
        assert!(matches!(result, Err(RgDeployError::Cancelled)));
    }

    #[tokio::test]
    async fn test_list_sorts_newest_first_and_skips_malformed() {
        let mut operations = MockDeploymentOperations::new();
        operations.expect_list().returning(|_| {
            let mut older = deployment_response("Succeeded");
            older["name"] = json!("older");
            older["properties"]["timestamp"] = json!("2023-01-01T00:00:00Z");
            let newer = deployment_response("Failed");
            Ok(vec![older, json!({"name": "broken"}), newer])
        });

        let deployments = manager(operations)
            .list("web-rg", &CancellationSignal::never())
            .await
            .unwrap();

        let names: Vec<&str> = deployments.iter().map(|d| d.deployment_name.as_str()).collect();
        assert_eq!(names, vec!["site", "older"]);
    }

    #[tokio::test]
    async fn test_validate_reports_rejection() {
        let mut operations = MockDeploymentOperations::new();
        operations.expect_validate().returning(|_| {
            Ok(json!({"error": {"code": "InvalidTemplate", "message": "size is not allowed"}}))
        });

        let outcome = manager(operations)
            .validate(&file_args(&[("size", "Small")]), false, &CancellationSignal::never())
            .await
            .unwrap();

        assert!(!outcome.valid);
        assert_eq!(outcome.message.as_deref(), Some("size is not allowed"));
    }

    #[test]
    fn test_default_deployment_name() {
        assert_eq!(
            default_deployment_name(&TemplateSource::LocalFile("./templates/web-site.json".to_string())),
            "web-site"
        );
        assert_eq!(
            default_deployment_name(&TemplateSource::RemoteUri("https://example.com/arm/vnet.json?sv=1".to_string())),
            "vnet"
        );
        assert_eq!(
            default_deployment_name(&TemplateSource::GalleryIdentity("Microsoft.WebSite.0.1.0".to_string())),
            "Microsoft.WebSite.0.1.0"
        );
        assert!(default_deployment_name(&TemplateSource::GalleryIdentity("has space".to_string()))
            .starts_with("deployment-"));
    }
}
