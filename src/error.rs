//! Unified error type for stylegen.

use thiserror::Error;

/// Errors that can end a pipeline invocation.
///
/// Every code path through the pipeline finishes in either a result or
/// exactly one of these.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Neither an instruction nor a usable style preset was supplied.
    #[error("Missing input: provide an instruction or a style preset")]
    MissingInput,

    /// The source image reference is structurally invalid or fails to decode.
    #[error("Malformed image reference: {0}")]
    MalformedImageReference(String),

    /// The source image media type is outside the accepted set.
    #[error("Unsupported media type '{0}'. Accepted: image/jpeg, image/png, image/webp")]
    UnsupportedMediaType(String),

    /// The provider could not be reached.
    #[error("Provider unreachable: {0}")]
    UpstreamUnreachable(String),

    /// The provider answered with a non-success status.
    #[error("Provider error ({status}): {message}")]
    UpstreamRejected {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Message extracted from the provider reply.
        message: String,
    },

    /// The provider answered successfully but no image could be extracted.
    #[error("Provider returned no image data")]
    NoImageData,

    /// The inbound request used a method other than POST.
    #[error("Method {0} not allowed; only POST is accepted")]
    MethodNotAllowed(String),

    /// The caller aborted the in-flight request.
    #[error("Request cancelled")]
    Cancelled,

    /// Invalid argument or unparseable inbound body.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error.
    #[error("Config error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image container conversion error.
    #[error("Image conversion error: {0}")]
    ImageConversion(String),

    /// No API key configured for the provider.
    #[error("No API key for {provider}. Set {env_var} or add it to config file.")]
    MissingApiKey {
        /// The provider name.
        provider: String,
        /// The environment variable name.
        env_var: String,
    },
}

impl PipelineError {
    /// HTTP status the inbound shell should answer with for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingInput
            | Self::MalformedImageReference(_)
            | Self::UnsupportedMediaType(_)
            | Self::InvalidArgument(_) => 400,
            Self::MethodNotAllowed(_) => 405,
            Self::UpstreamRejected { status, .. } if (400..=599).contains(status) => *status,
            _ => 500,
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        Self::UpstreamUnreachable(err.to_string())
    }
}
