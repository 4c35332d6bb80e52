//! Dynamic parameter discovery
//!
//! Discovery fetches the parameter schema of the active template source and
//! reports the parameters the caller still has to supply. What was fetched for
//! a source is handed back as a [`PreviousSource`] snapshot; passing it to the
//! next call skips the fetch while the source stays the same.

use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use super::fetcher::TemplateFetcher;
use super::models::{parse_template_parameters, ParameterDescriptor, ParameterValueSet};
use super::parameters::load_parameter_file;
use super::source::TemplateSource;
use crate::error::{Result, RgDeployError};
use crate::gallery::{GalleryClient, GalleryItem};
use crate::utils::cancel::CancellationSignal;

/// Template content fetched during discovery
#[derive(Debug, Clone, PartialEq)]
pub enum FetchedTemplate {
    /// Gallery item; deployments link to its template
    Gallery(GalleryItem),
    /// Template body read from a local file or a URI
    Document(Value),
}

/// Source identity, fetched template and full schema from an earlier discovery
#[derive(Debug, Clone, PartialEq)]
pub struct PreviousSource {
    pub source: TemplateSource,
    pub template: FetchedTemplate,
    pub schema: Vec<ParameterDescriptor>,
}

/// Inputs of one discovery call
#[derive(Debug, Clone, Copy)]
pub struct DiscoveryRequest<'a> {
    pub source: &'a TemplateSource,
    pub inline: Option<&'a ParameterValueSet>,
    pub parameter_file: Option<&'a Path>,
    /// Names the caller already owns, such as its own fixed options
    pub already_bound: &'a [String],
}

/// Result of a discovery call
#[derive(Debug, Clone)]
pub struct Discovery {
    /// Parameters still to be supplied, in declaration order
    pub parameters: Vec<ParameterDescriptor>,
    /// Values read from the parameter file, if one was given
    pub file_parameters: Option<ParameterValueSet>,
    /// Snapshot to pass to the next call
    pub snapshot: PreviousSource,
}

impl Discovery {
    /// Full schema of the template, including excluded parameters
    pub fn schema(&self) -> &[ParameterDescriptor] {
        &self.snapshot.schema
    }

    /// The template the schema was read from
    pub fn template(&self) -> &FetchedTemplate {
        &self.snapshot.template
    }
}

/// Discovers template parameters through the gallery or the fetcher
pub struct ParameterDiscoverer {
    gallery: Arc<dyn GalleryClient>,
    fetcher: Arc<dyn TemplateFetcher>,
}

impl ParameterDiscoverer {
    pub fn new(gallery: Arc<dyn GalleryClient>, fetcher: Arc<dyn TemplateFetcher>) -> Self {
        Self { gallery, fetcher }
    }

    /// Discover the parameters still missing for `request.source`.
    ///
    /// Parameters present in the inline object, in the parameter file or in
    /// `already_bound` are left out. The template is re-fetched only when the
    /// source differs from `previous`.
    pub async fn discover(
        &self,
        request: DiscoveryRequest<'_>,
        previous: Option<&PreviousSource>,
        cancel: &CancellationSignal,
    ) -> Result<Discovery> {
        let (template, schema) = match previous {
            Some(previous) if !request.source.differs_from(Some(&previous.source)) => {
                debug!(source = %request.source, "reusing cached template parameter schema");
                (previous.template.clone(), previous.schema.clone())
            }
            _ => {
                debug!(source = %request.source, "fetching template parameter schema");
                self.fetch(request.source, cancel).await?
            }
        };

        let file_parameters = match request.parameter_file {
            Some(path) => Some(load_parameter_file(path).await?),
            None => None,
        };

        let parameters = schema
            .iter()
            .filter(|descriptor| {
                let supplied_inline = request.inline.is_some_and(|p| p.contains(&descriptor.name));
                let supplied_by_file = file_parameters
                    .as_ref()
                    .is_some_and(|p| p.contains(&descriptor.name));
                let bound = request
                    .already_bound
                    .iter()
                    .any(|name| descriptor.is_named(name));
                !(supplied_inline || supplied_by_file || bound)
            })
            .cloned()
            .collect();

        Ok(Discovery {
            parameters,
            file_parameters,
            snapshot: PreviousSource {
                source: request.source.clone(),
                template,
                schema,
            },
        })
    }

    async fn fetch(
        &self,
        source: &TemplateSource,
        cancel: &CancellationSignal,
    ) -> Result<(FetchedTemplate, Vec<ParameterDescriptor>)> {
        let (item, body) = match source {
            TemplateSource::GalleryIdentity(identity) => {
                let item = cancel
                    .run(self.gallery.get_gallery_item(identity))
                    .await
                    .map_err(|e| wrap_gallery_error(identity, e))?;
                let body = cancel
                    .run(self.gallery.get_template_body(&item))
                    .await
                    .map_err(|e| wrap_gallery_error(identity, e))?;
                (Some(item), body)
            }
            TemplateSource::LocalFile(location) | TemplateSource::RemoteUri(location) => {
                let bytes = cancel.run(self.fetcher.read(location)).await?;
                let body = serde_json::from_slice(&bytes).map_err(|e| {
                    RgDeployError::template_parse(source.property_name(), location.as_str(), e.to_string())
                })?;
                (None, body)
            }
        };

        let schema = parse_template_parameters(&body).map_err(|details| {
            RgDeployError::template_parse(source.property_name(), source.location(), details)
        })?;

        let template = match item {
            Some(item) => FetchedTemplate::Gallery(item),
            None => FetchedTemplate::Document(body),
        };
        Ok((template, schema))
    }
}

fn wrap_gallery_error(identity: &str, error: RgDeployError) -> RgDeployError {
    match error {
        RgDeployError::Cancelled
        | RgDeployError::GalleryLookupFailed { .. }
        | RgDeployError::TemplateParseFailed { .. } => error,
        other => RgDeployError::gallery_lookup(identity, other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::MockGalleryClient;
    use crate::template::fetcher::MockTemplateFetcher;
    use crate::utils::cancel::cancellation_pair;
    use mockall::predicate::eq;
    use serde_json::json;
    use std::io::Write;

    const NO_BOUND_NAMES: &[String] = &[];
    const SIZE_TEMPLATE: &str = r#"{"parameters":{"size":{"type":"string"}}}"#;

    fn file_fetcher(contents: &'static str, times: usize) -> MockTemplateFetcher {
        let mut fetcher = MockTemplateFetcher::new();
        fetcher
            .expect_read()
            .times(times)
            .returning(move |_| Ok(contents.as_bytes().to_vec()));
        fetcher
    }

    fn discoverer(gallery: MockGalleryClient, fetcher: MockTemplateFetcher) -> ParameterDiscoverer {
        ParameterDiscoverer::new(Arc::new(gallery), Arc::new(fetcher))
    }

    fn request<'a>(source: &'a TemplateSource) -> DiscoveryRequest<'a> {
        DiscoveryRequest {
            source,
            inline: None,
            parameter_file: None,
            already_bound: NO_BOUND_NAMES,
        }
    }

    #[tokio::test]
    async fn test_local_file_declares_mandatory_parameter() {
        let discoverer = discoverer(MockGalleryClient::new(), file_fetcher(SIZE_TEMPLATE, 1));
        let source = TemplateSource::LocalFile("template.json".to_string());
        let inline = ParameterValueSet::new();

        let discovery = discoverer
            .discover(
                DiscoveryRequest {
                    inline: Some(&inline),
                    ..request(&source)
                },
                None,
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        assert_eq!(discovery.parameters.len(), 1);
        assert_eq!(discovery.parameters[0].name, "size");
        assert!(discovery.parameters[0].mandatory);
    }

    #[tokio::test]
    async fn test_default_value_makes_parameter_optional() {
        let fetcher = file_fetcher(
            r#"{"parameters":{"size":{"type":"string","defaultValue":"Small"}}}"#,
            1,
        );
        let discoverer = discoverer(MockGalleryClient::new(), fetcher);
        let source = TemplateSource::LocalFile("template.json".to_string());

        let discovery = discoverer
            .discover(request(&source), None, &CancellationSignal::never())
            .await
            .unwrap();
        assert!(!discovery.parameters[0].mandatory);
    }

    #[tokio::test]
    async fn test_supplied_and_bound_parameters_are_excluded() {
        let fetcher = file_fetcher(
            r#"{"parameters":{
                "fromInline":{"type":"string"},
                "fromFile":{"type":"int"},
                "Name":{"type":"string"},
                "stillMissing":{"type":"bool"}
            }}"#,
            1,
        );
        let discoverer = discoverer(MockGalleryClient::new(), fetcher);
        let source = TemplateSource::LocalFile("template.json".to_string());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"fromFile": {{"value": 3}}}}"#).unwrap();
        let inline = ParameterValueSet::from_json_object(json!({"FROMINLINE": "x"})).unwrap();
        let bound = vec!["name".to_string()];

        let discovery = discoverer
            .discover(
                DiscoveryRequest {
                    source: &source,
                    inline: Some(&inline),
                    parameter_file: Some(file.path()),
                    already_bound: &bound,
                },
                None,
                &CancellationSignal::never(),
            )
            .await
            .unwrap();

        let names: Vec<&str> = discovery.parameters.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["stillMissing"]);
        assert_eq!(discovery.schema().len(), 4);
        assert_eq!(
            discovery.file_parameters.as_ref().and_then(|p| p.get("fromFile")),
            Some(&json!(3))
        );
    }

    #[tokio::test]
    async fn test_same_source_reuses_schema() {
        let discoverer = discoverer(MockGalleryClient::new(), file_fetcher(SIZE_TEMPLATE, 1));
        let first_source = TemplateSource::LocalFile("Template.json".to_string());
        let second_source = TemplateSource::LocalFile("template.JSON".to_string());
        let cancel = CancellationSignal::never();

        let first = discoverer.discover(request(&first_source), None, &cancel).await.unwrap();
        let second = discoverer
            .discover(request(&second_source), Some(&first.snapshot), &cancel)
            .await
            .unwrap();

        assert_eq!(first.parameters, second.parameters);
        assert!(matches!(second.template(), FetchedTemplate::Document(body) if body["parameters"]["size"].is_object()));
    }

    #[tokio::test]
    async fn test_changed_source_refetches() {
        let mut fetcher = MockTemplateFetcher::new();
        fetcher
            .expect_read()
            .with(eq("first.json"))
            .times(1)
            .returning(|_| Ok(SIZE_TEMPLATE.as_bytes().to_vec()));
        fetcher
            .expect_read()
            .with(eq("second.json"))
            .times(1)
            .returning(|_| Ok(br#"{"parameters":{"count":{"type":"int"}}}"#.to_vec()));

        let discoverer = discoverer(MockGalleryClient::new(), fetcher);
        let cancel = CancellationSignal::never();
        let first_source = TemplateSource::LocalFile("first.json".to_string());
        let second_source = TemplateSource::LocalFile("second.json".to_string());

        let first = discoverer.discover(request(&first_source), None, &cancel).await.unwrap();
        let second = discoverer
            .discover(request(&second_source), Some(&first.snapshot), &cancel)
            .await
            .unwrap();

        assert_eq!(second.parameters[0].name, "count");
        assert_eq!(second.snapshot.source, second_source);
    }

    fn website_item(identity: &str) -> GalleryItem {
        GalleryItem {
            identity: identity.to_string(),
            display_name: "Website".to_string(),
            publisher: "Microsoft".to_string(),
            version: "0.1.0".to_string(),
            template_uri: "https://gallery.example.com/Website.json".to_string(),
        }
    }

    #[tokio::test]
    async fn test_gallery_failure_is_wrapped() {
        let mut gallery = MockGalleryClient::new();
        gallery
            .expect_get_gallery_item()
            .with(eq("Microsoft.Missing.1.0.0"))
            .times(1)
            .returning(|_| Err(RgDeployError::azure_api("HTTP 500: boom")));

        let discoverer = discoverer(gallery, MockTemplateFetcher::new());
        let source = TemplateSource::GalleryIdentity("Microsoft.Missing.1.0.0".to_string());

        match discoverer
            .discover(request(&source), None, &CancellationSignal::never())
            .await
        {
            Err(RgDeployError::GalleryLookupFailed { identity, details }) => {
                assert_eq!(identity, "Microsoft.Missing.1.0.0");
                assert!(details.contains("HTTP 500"));
            }
            other => panic!("expected GalleryLookupFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_gallery_item_is_looked_up_once_and_kept() {
        let mut gallery = MockGalleryClient::new();
        gallery
            .expect_get_gallery_item()
            .times(1)
            .returning(|identity| Ok(website_item(identity)));
        gallery
            .expect_get_template_body()
            .times(1)
            .returning(|_| Ok(json!({"parameters": {"siteName": {"type": "string"}}})));

        let discoverer = discoverer(gallery, MockTemplateFetcher::new());
        let source = TemplateSource::GalleryIdentity("Microsoft.WebSite".to_string());
        let cancel = CancellationSignal::never();

        let discovery = discoverer.discover(request(&source), None, &cancel).await.unwrap();
        assert_eq!(discovery.parameters[0].name, "siteName");
        assert_eq!(
            discovery.template(),
            &FetchedTemplate::Gallery(website_item("Microsoft.WebSite"))
        );

        let again = discoverer
            .discover(request(&source), Some(&discovery.snapshot), &cancel)
            .await
            .unwrap();
        assert_eq!(again.template(), discovery.template());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_pending_fetch() {
        struct PendingFetcher;

        #[async_trait::async_trait]
        impl TemplateFetcher for PendingFetcher {
            async fn read(&self, _location: &str) -> Result<Vec<u8>> {
                std::future::pending().await
            }
        }

        let discoverer = ParameterDiscoverer::new(Arc::new(MockGalleryClient::new()), Arc::new(PendingFetcher));
        let source = TemplateSource::RemoteUri("https://example.com/t.json".to_string());
        let (handle, cancel) = cancellation_pair();

        let (result, _) = tokio::join!(discoverer.discover(request(&source), None, &cancel), async {
            tokio::task::yield_now().await;
            handle.cancel();
        });

        assert!(matches!(result, Err(RgDeployError::Cancelled)));
    }

    #[tokio::test]
    async fn test_malformed_template_fails_to_parse() {
        for body in ["{not json", r#"{"resources": []}"#] {
            let discoverer = discoverer(MockGalleryClient::new(), file_fetcher(body, 1));
            let source = TemplateSource::RemoteUri("https://example.com/t.json".to_string());

            match discoverer
                .discover(request(&source), None, &CancellationSignal::never())
                .await
            {
                Err(RgDeployError::TemplateParseFailed { property, value, .. }) => {
                    assert_eq!(property, "TemplateUri");
                    assert_eq!(value, "https://example.com/t.json");
                }
                other => panic!("expected TemplateParseFailed, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_missing_parameter_file_fails_discovery() {
        let discoverer = discoverer(MockGalleryClient::new(), file_fetcher(SIZE_TEMPLATE, 1));
        let source = TemplateSource::LocalFile("template.json".to_string());
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");

        let result = discoverer
            .discover(
                DiscoveryRequest {
                    parameter_file: Some(&missing),
                    ..request(&source)
                },
                None,
                &CancellationSignal::never(),
            )
            .await;
        assert!(matches!(result, Err(RgDeployError::ParameterFileNotFound { .. })));
    }
}
