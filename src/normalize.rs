//! Response normalization: provider replies into one canonical result or
//! one classified error.

use serde::Serialize;
use serde_json::Value;

use crate::codec::inline_png_reference;
use crate::error::PipelineError;
use crate::ports::ProviderReply;

/// One generated image, as a link or as an inline `data:` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ImageRef {
    /// Provider-hosted link.
    Url(String),
    /// Inline `data:image/png;base64,...` reference.
    Inline(String),
}

/// The canonical output of one pipeline run. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationResult {
    images: Vec<ImageRef>,
    requested: u32,
}

impl GenerationResult {
    /// All images in provider order.
    #[must_use]
    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    /// Number of images; always at least 1.
    #[must_use]
    pub fn count(&self) -> usize {
        self.images.len()
    }

    /// Convenience single image, populated only when one image was requested.
    #[must_use]
    pub fn image(&self) -> Option<&ImageRef> {
        if self.requested == 1 {
            self.images.first()
        } else {
            None
        }
    }
}

/// How a reply body parsed.
#[derive(Debug)]
enum ReplyBody {
    Structured(Value),
    Text(String),
}

fn parse_body(body: &str) -> ReplyBody {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => ReplyBody::Structured(value),
        Err(_) => ReplyBody::Text(body.to_string()),
    }
}

/// Turn a provider reply into a result.
///
/// # Errors
///
/// Returns `UpstreamRejected` for non-2xx replies and `NoImageData` when a
/// successful reply carries no extractable image.
pub fn normalize(
    reply: &ProviderReply,
    requested: u32,
    excerpt_limit: usize,
) -> Result<GenerationResult, PipelineError> {
    if !reply.is_success() {
        return Err(rejection(reply, excerpt_limit));
    }

    let ReplyBody::Structured(value) = parse_body(&reply.body) else {
        tracing::warn!(status = reply.status, "provider success body is not JSON");
        return Err(PipelineError::NoImageData);
    };

    let images: Vec<ImageRef> = value
        .get("data")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(extract_image).collect())
        .unwrap_or_default();

    if images.is_empty() {
        return Err(PipelineError::NoImageData);
    }
    Ok(GenerationResult { images, requested })
}

/// Link first, inline bytes second, nothing otherwise.
fn extract_image(item: &Value) -> Option<ImageRef> {
    let field = |name: &str| item.get(name).and_then(Value::as_str).filter(|s| !s.is_empty());
    if let Some(url) = field("url") {
        return Some(ImageRef::Url(url.to_string()));
    }
    field("b64_json").map(|b64| ImageRef::Inline(inline_png_reference(b64)))
}

/// Classify a non-success reply.
///
/// The message comes from the structured error field when the body is JSON,
/// otherwise from a bounded excerpt of the raw body.
#[must_use]
pub fn rejection(reply: &ProviderReply, excerpt_limit: usize) -> PipelineError {
    let message = match parse_body(&reply.body) {
        ReplyBody::Structured(value) => {
            structured_message(&value).unwrap_or_else(|| excerpt(&reply.body, excerpt_limit))
        }
        ReplyBody::Text(text) => excerpt(&text, excerpt_limit),
    };
    let message = if message.is_empty() {
        format!("provider error ({})", reply.status)
    } else {
        message
    };
    PipelineError::UpstreamRejected { status: reply.status, message }
}

/// `{error: {message}}`, `{error: "..."}`, or a top-level `message`.
fn structured_message(value: &Value) -> Option<String> {
    let error = value.get("error");
    error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .or_else(|| error.and_then(Value::as_str))
        .or_else(|| value.get("message").and_then(Value::as_str))
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(ToString::to_string)
}

/// First `limit` characters of the trimmed body.
fn excerpt(body: &str, limit: usize) -> String {
    body.trim().chars().take(limit).collect()
}

/// Extract the description text from a chat-completions reply.
///
/// # Errors
///
/// Returns `UpstreamRejected` for non-2xx replies.
pub fn extract_tags(reply: &ProviderReply, excerpt_limit: usize) -> Result<String, PipelineError> {
    if !reply.is_success() {
        return Err(rejection(reply, excerpt_limit));
    }
    let tags = match parse_body(&reply.body) {
        ReplyBody::Structured(value) => value
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        ReplyBody::Text(_) => String::new(),
    };
    Ok(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &str) -> ProviderReply {
        ProviderReply { status: 200, body: body.to_string() }
    }

    #[test]
    fn single_url_fills_convenience_field() {
        let result = normalize(&ok(r#"{"data":[{"url":"https://img/1.png"}]}"#), 1, 300).unwrap();
        assert_eq!(result.count(), 1);
        assert_eq!(result.image(), Some(&ImageRef::Url("https://img/1.png".into())));
    }

    #[test]
    fn inline_bytes_are_wrapped_not_reencoded() {
        let result = normalize(&ok(r#"{"data":[{"b64_json":"iVBORw0KGgo="}]}"#), 1, 300).unwrap();
        assert_eq!(
            result.images(),
            &[ImageRef::Inline("data:image/png;base64,iVBORw0KGgo=".into())]
        );
    }

    #[test]
    fn url_preferred_over_inline() {
        let body = r#"{"data":[{"url":"https://img/1.png","b64_json":"AAAA"}]}"#;
        let result = normalize(&ok(body), 1, 300).unwrap();
        assert_eq!(result.images()[0], ImageRef::Url("https://img/1.png".into()));
    }

    #[test]
    fn batch_populates_collection_only() {
        let body = r#"{"data":[{"url":"https://img/1.png"},{"b64_json":"AAAA"},{"url":""}]}"#;
        let result = normalize(&ok(body), 3, 300).unwrap();
        assert_eq!(result.count(), 2);
        assert!(result.image().is_none());
        assert_eq!(result.images()[1], ImageRef::Inline("data:image/png;base64,AAAA".into()));
    }

    #[test]
    fn empty_collection_is_no_image_data() {
        let err = normalize(&ok(r#"{"data":[]}"#), 1, 300).unwrap_err();
        assert!(matches!(err, PipelineError::NoImageData));
    }

    #[test]
    fn items_without_image_are_no_image_data() {
        let err = normalize(&ok(r#"{"data":[{"revised_prompt":"x"},{}]}"#), 2, 300).unwrap_err();
        assert!(matches!(err, PipelineError::NoImageData));
    }

    #[test]
    fn missing_data_field_is_no_image_data() {
        assert!(matches!(normalize(&ok("{}"), 1, 300).unwrap_err(), PipelineError::NoImageData));
    }

    #[test]
    fn non_json_success_is_no_image_data() {
        let err = normalize(&ok("<html>ok</html>"), 1, 300).unwrap_err();
        assert!(matches!(err, PipelineError::NoImageData));
    }

    #[test]
    fn structured_error_message_extracted() {
        let reply = ProviderReply {
            status: 400,
            body: r#"{"error":{"message":"Invalid image","type":"invalid_request_error"}}"#.into(),
        };
        let err = normalize(&reply, 1, 300).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::UpstreamRejected { status: 400, ref message } if message == "Invalid image"
        ));
    }

    #[test]
    fn string_error_field_extracted() {
        let reply = ProviderReply { status: 429, body: r#"{"error":"slow down"}"#.into() };
        assert!(matches!(
            rejection(&reply, 300),
            PipelineError::UpstreamRejected { status: 429, ref message } if message == "slow down"
        ));
    }

    #[test]
    fn plain_text_error_is_excerpted() {
        let reply = ProviderReply { status: 500, body: "Internal Server Error".into() };
        assert!(matches!(
            normalize(&reply, 1, 300).unwrap_err(),
            PipelineError::UpstreamRejected { status: 500, ref message }
                if message == "Internal Server Error"
        ));
    }

    #[test]
    fn long_text_error_is_truncated() {
        let reply = ProviderReply { status: 502, body: "x".repeat(1000) };
        let PipelineError::UpstreamRejected { message, .. } = rejection(&reply, 300) else {
            panic!("expected rejection");
        };
        assert_eq!(message, "x".repeat(300));
        assert_eq!(message.chars().count(), 300);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let reply = ProviderReply { status: 500, body: "画像".repeat(10) };
        let PipelineError::UpstreamRejected { message, .. } = rejection(&reply, 3) else {
            panic!("expected rejection");
        };
        assert_eq!(message, "画像画");
    }

    #[test]
    fn empty_error_body_gets_status_message() {
        let reply = ProviderReply { status: 503, body: String::new() };
        assert!(matches!(
            rejection(&reply, 300),
            PipelineError::UpstreamRejected { status: 503, ref message }
                if message == "provider error (503)"
        ));
    }

    #[test]
    fn structured_body_without_message_is_excerpted() {
        let reply = ProviderReply { status: 413, body: r#"{"detail":"too big"}"#.into() };
        assert!(matches!(
            rejection(&reply, 300),
            PipelineError::UpstreamRejected { status: 413, ref message }
                if message == r#"{"detail":"too big"}"#
        ));
    }

    #[test]
    fn tags_extracted_and_trimmed() {
        let body = r#"{"choices":[{"message":{"content":"  1girl, smile, red hair \n"}}]}"#;
        assert_eq!(extract_tags(&ok(body), 300).unwrap(), "1girl, smile, red hair");
        assert_eq!(extract_tags(&ok("{}"), 300).unwrap(), "");
    }

    #[test]
    fn tags_rejection_classified() {
        let reply = ProviderReply { status: 401, body: r#"{"error":{"message":"bad key"}}"#.into() };
        assert!(matches!(
            extract_tags(&reply, 300).unwrap_err(),
            PipelineError::UpstreamRejected { status: 401, .. }
        ));
    }
}
