//! Inbound request shape and canonical response body.
//!
//! This is the one place that decides whether a request carries a source
//! image; everything downstream sees a single `Option<ImageSource>`.

use serde::de::{self, Deserializer};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::PipelineError;
use crate::normalize::GenerationResult;
use crate::request::{GenerationRequest, ImageSource, ToneOptions};

/// Inbound JSON body as sent by the browser UI.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundRequest {
    #[serde(default, alias = "instruction")]
    prompt: Option<String>,
    #[serde(default)]
    options: InboundOptions,
    #[serde(default, alias = "preset", deserialize_with = "string_or_number")]
    style: Option<String>,
    #[serde(default)]
    image: Option<InboundImage>,
    #[serde(default)]
    image_data_url: Option<String>,
    #[serde(default)]
    image_data: Option<String>,
    #[serde(default, alias = "n", alias = "count")]
    batch_size: Option<u32>,
}

/// The options bag; unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InboundOptions {
    #[serde(default, alias = "preset", deserialize_with = "string_or_number")]
    style: Option<String>,
    #[serde(default)]
    lite: bool,
    #[serde(default)]
    brightness_up: bool,
    #[serde(default)]
    mood_boost: bool,
    #[serde(default)]
    smile: bool,
    #[serde(default)]
    clean: bool,
    #[serde(default)]
    bg_transparent: bool,
    #[serde(default)]
    bg_preset: Option<String>,
    #[serde(default)]
    lock_face: Option<bool>,
    #[serde(default)]
    strong_style: bool,
}

/// `image` is either a bare reference string or an upload object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InboundImage {
    Reference(String),
    Upload {
        #[serde(default)]
        data: Option<String>,
        #[serde(default, rename = "type")]
        media_type: Option<String>,
        #[serde(default)]
        name: Option<String>,
    },
}

/// Presets arrive as `"chibi"` or as legacy numbers like `1`.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(de::Error::custom(format!("expected string or number, got {other}"))),
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

/// The first non-blank image field wins: `image`, then `imageDataUrl`, then `imageData`.
///
/// A bare `image` string may be a `data:` reference or raw base64. An upload
/// object without data is an error, never a silent fall back to synthesis.
fn source_image(
    image: Option<InboundImage>,
    data_url: Option<String>,
    data: Option<String>,
) -> Result<Option<ImageSource>, PipelineError> {
    match image {
        Some(InboundImage::Reference(r)) if !r.trim().is_empty() => {
            return Ok(Some(ImageSource::Parts { media_type: None, base64: r, file_name: None }));
        }
        Some(InboundImage::Upload { data, media_type, name }) => {
            let Some(data) = non_blank(data) else {
                return Err(PipelineError::MalformedImageReference(
                    "image upload carries no data".into(),
                ));
            };
            return Ok(Some(ImageSource::Parts { media_type, base64: data, file_name: name }));
        }
        _ => {}
    }
    let reference = |reference: String| ImageSource::DataUrl { reference, file_name: None };
    Ok(non_blank(data_url).or_else(|| non_blank(data)).map(reference))
}

impl InboundRequest {
    fn into_generation_request(self) -> Result<GenerationRequest, PipelineError> {
        let options = self.options;
        let tone = ToneOptions {
            brighten: options.lite || options.brightness_up,
            mood_boost: options.mood_boost,
            smile: options.smile,
            clean: options.clean,
            bg_transparent: options.bg_transparent,
            bg_preset: non_blank(options.bg_preset),
            lock_face: options.lock_face,
            strong_style: options.strong_style,
        };
        Ok(GenerationRequest {
            instruction: self.prompt.unwrap_or_default(),
            style_preset: non_blank(options.style).or_else(|| non_blank(self.style)),
            tone,
            source_image: source_image(self.image, self.image_data_url, self.image_data)?,
            batch_size: self.batch_size,
        })
    }
}

/// Check the method and parse an inbound body into a generation request.
///
/// # Errors
///
/// Returns `MethodNotAllowed` for anything but POST, `InvalidArgument`
/// for a body that is not a JSON object of the expected shape, and
/// `MalformedImageReference` for an image upload without data.
pub fn parse_inbound(method: &str, body: &str) -> Result<GenerationRequest, PipelineError> {
    if !method.eq_ignore_ascii_case("POST") {
        return Err(PipelineError::MethodNotAllowed(method.to_string()));
    }
    let inbound: InboundRequest = if body.trim().is_empty() {
        InboundRequest::default()
    } else {
        serde_json::from_str(body)
            .map_err(|e| PipelineError::InvalidArgument(format!("request body: {e}")))?
    };
    inbound.into_generation_request()
}

/// Status and JSON body handed back to the HTTP shell.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalResponse {
    /// HTTP status code.
    pub status: u16,
    /// `{image}`, `{images}`, or `{error}`.
    pub body: Value,
}

impl CanonicalResponse {
    /// Build the response for a pipeline outcome.
    #[must_use]
    pub fn from_outcome(outcome: &Result<GenerationResult, PipelineError>) -> Self {
        match outcome {
            Ok(result) => Self::success(result),
            Err(e) => Self::error(e),
        }
    }

    /// `{image}` when one image was requested, `{images}` otherwise.
    #[must_use]
    pub fn success(result: &GenerationResult) -> Self {
        let body = match result.image() {
            Some(image) => json!({ "image": image }),
            None => json!({ "images": result.images() }),
        };
        Self { status: 200, body }
    }

    /// `{error}` with the status mirrored from the error class.
    #[must_use]
    pub fn error(err: &PipelineError) -> Self {
        Self { status: err.status_code(), body: json!({ "error": err.to_string() }) }
    }
}
