//! Image provider port: one outbound call per request, raw reply back.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::codec::EncodedImage;
use crate::error::PipelineError;

/// The outbound request, one variant per mode.
///
/// Synthesis travels as a JSON body, edit as a multipart body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ProviderRequest {
    /// Pure text-to-image synthesis.
    Synthesis {
        /// Composed prompt text.
        prompt: String,
        /// Output size token.
        size: String,
        /// Quality tier.
        quality: String,
        /// Number of images, already clamped.
        count: u32,
    },
    /// Image-conditioned edit.
    Edit {
        /// Composed prompt text.
        prompt: String,
        /// Output size token.
        size: String,
        /// Quality tier.
        quality: String,
        /// Number of images, already clamped.
        count: u32,
        /// Validated source image.
        image: EncodedImage,
    },
}

impl ProviderRequest {
    /// Short mode name for logs.
    #[must_use]
    pub fn mode(&self) -> &'static str {
        match self {
            Self::Synthesis { .. } => "synthesis",
            Self::Edit { .. } => "edit",
        }
    }

    /// The prompt text sent to the provider.
    #[must_use]
    pub fn prompt(&self) -> &str {
        match self {
            Self::Synthesis { prompt, .. } | Self::Edit { prompt, .. } => prompt,
        }
    }

    /// The image count sent to the provider.
    #[must_use]
    pub fn count(&self) -> u32 {
        match self {
            Self::Synthesis { count, .. } | Self::Edit { count, .. } => *count,
        }
    }
}

/// A provider reply before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderReply {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body; may or may not be JSON.
    pub body: String,
}

impl ProviderReply {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Boxed future type returned by [`ImageProvider`] methods.
pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ProviderReply, PipelineError>> + Send + 'a>>;

/// Sends requests to an external image provider.
///
/// Implementations return transport failures as `UpstreamUnreachable` and
/// hand back every HTTP reply, successful or not, unparsed.
pub trait ImageProvider: Send + Sync {
    /// Send one synthesis or edit request.
    fn send(&self, request: &ProviderRequest) -> ProviderFuture<'_>;

    /// Ask the provider's vision model to describe an image as tags.
    fn describe(&self, image: &EncodedImage) -> ProviderFuture<'_>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_request_serialization() {
        let request = ProviderRequest::Edit {
            prompt: "a cat".into(),
            size: "1024x1024".into(),
            quality: "high".into(),
            count: 2,
            image: EncodedImage::new("image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0]),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["mode"], "edit");
        assert_eq!(json["image"]["bytes"], "/9j/4A==");

        let deserialized: ProviderRequest = serde_json::from_value(json).unwrap();
        assert_eq!(deserialized, request);
    }

    #[test]
    fn accessors() {
        let request = ProviderRequest::Synthesis {
            prompt: "a cat".into(),
            size: "1024x1024".into(),
            quality: "high".into(),
            count: 3,
        };
        assert_eq!(request.mode(), "synthesis");
        assert_eq!(request.prompt(), "a cat");
        assert_eq!(request.count(), 3);
    }

    #[test]
    fn reply_success_range() {
        assert!(ProviderReply { status: 200, body: String::new() }.is_success());
        assert!(!ProviderReply { status: 302, body: String::new() }.is_success());
        assert!(!ProviderReply { status: 500, body: String::new() }.is_success());
    }
}
