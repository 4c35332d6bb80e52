use thiserror::Error;

/// Main error type for rgdeploy operations
#[derive(Debug, Error)]
pub enum RgDeployError {
    #[error("Only one template source may be specified, but {} were set", .sources.join(", "))]
    ConflictingSource { sources: Vec<String> },

    #[error("No template source specified. Use one of GalleryTemplateIdentity, TemplateFile or TemplateUri")]
    NoSource,

    #[error("Unable to find gallery template '{identity}': {details}")]
    GalleryLookupFailed { identity: String, details: String },

    #[error("Failed to parse '{property}' property with value '{value}': {details}")]
    TemplateParseFailed {
        property: String,
        value: String,
        details: String,
    },

    #[error("Template source '{location}' is unreachable: {details}")]
    SourceUnreachable { location: String, details: String },

    #[error("Template parameter file '{path}' is invalid: {details}")]
    ParameterFileInvalid { path: String, details: String },

    #[error("Template parameter file not found: {path}")]
    ParameterFileNotFound { path: String },

    #[error("Missing value for mandatory template parameter '{name}'")]
    MissingMandatoryParameter { name: String },

    #[error("Invalid value for template parameter '{name}': {details}")]
    InvalidParameterValue { name: String, details: String },

    #[error("Malformed deployment response: missing or invalid '{field}'")]
    MalformedResponse { field: String },

    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Azure API error: {0}")]
    AzureApiError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl RgDeployError {
    pub fn conflicting_source<S: Into<String>>(sources: impl IntoIterator<Item = S>) -> Self {
        Self::ConflictingSource {
            sources: sources.into_iter().map(Into::into).collect(),
        }
    }

    pub fn gallery_lookup<S: Into<String>, D: std::fmt::Display>(identity: S, details: D) -> Self {
        Self::GalleryLookupFailed {
            identity: identity.into(),
            details: details.to_string(),
        }
    }

    pub fn template_parse<P: Into<String>, V: Into<String>, D: Into<String>>(
        property: P,
        value: V,
        details: D,
    ) -> Self {
        Self::TemplateParseFailed {
            property: property.into(),
            value: value.into(),
            details: details.into(),
        }
    }

    pub fn source_unreachable<S: Into<String>, D: std::fmt::Display>(location: S, details: D) -> Self {
        Self::SourceUnreachable {
            location: location.into(),
            details: details.to_string(),
        }
    }

    pub fn parameter_file_invalid<S: Into<String>, D: std::fmt::Display>(path: S, details: D) -> Self {
        Self::ParameterFileInvalid {
            path: path.into(),
            details: details.to_string(),
        }
    }

    pub fn parameter_file_not_found<S: Into<String>>(path: S) -> Self {
        Self::ParameterFileNotFound { path: path.into() }
    }

    pub fn missing_mandatory<S: Into<String>>(name: S) -> Self {
        Self::MissingMandatoryParameter { name: name.into() }
    }

    pub fn invalid_parameter_value<S: Into<String>, D: Into<String>>(name: S, details: D) -> Self {
        Self::InvalidParameterValue {
            name: name.into(),
            details: details.into(),
        }
    }

    pub fn malformed_response<S: Into<String>>(field: S) -> Self {
        Self::MalformedResponse { field: field.into() }
    }

    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        Self::AuthenticationError(msg.into())
    }

    pub fn azure_api<S: Into<String>>(msg: S) -> Self {
        Self::AzureApiError(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::NetworkError(msg.into())
    }

    pub fn connection_timeout<S: Into<String>>(msg: S) -> Self {
        Self::ConnectionTimeout(msg.into())
    }

    pub fn serialization<S: Into<String>>(msg: S) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result type alias for rgdeploy operations
pub type Result<T> = std::result::Result<T, RgDeployError>;

/// Convert Azure Core errors to RgDeployError
impl From<azure_core::Error> for RgDeployError {
    fn from(error: azure_core::Error) -> Self {
        Self::AzureApiError(error.to_string())
    }
}
