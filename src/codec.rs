//! Payload codec: inbound image references to validated bytes and back.

use std::io::Cursor;
use std::path::Path;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::request::ImageSource;

/// Media types the provider accepts for edit requests.
pub const ACCEPTED_MEDIA_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

const OCTET_STREAM: &str = "application/octet-stream";

/// Standard alphabet; inbound padding is optional.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// Image bytes tagged with an accepted media type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// One of [`ACCEPTED_MEDIA_TYPES`] once it has passed the codec.
    pub media_type: String,
    /// Raw image bytes.
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    /// Tag raw bytes with a media type.
    #[must_use]
    pub fn new(media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { media_type: media_type.into(), bytes }
    }

    /// Encode back into a `data:` reference.
    #[must_use]
    pub fn to_data_url(&self) -> String {
        let payload = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{};base64,{payload}", self.media_type)
    }

    /// File name used for the multipart image part.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!("image.{}", crate::params::extension_for_media_type(&self.media_type))
    }
}

/// Run any inbound image representation through the codec.
///
/// # Errors
///
/// Returns `MalformedImageReference` for structural or payload problems and
/// `UnsupportedMediaType` when the type is outside the allow-list.
pub fn decode(source: &ImageSource) -> Result<EncodedImage, PipelineError> {
    match source {
        ImageSource::DataUrl { reference, file_name } => {
            decode_reference(reference, file_name.as_deref())
        }
        ImageSource::Parts { media_type, base64, file_name } => {
            decode_parts(media_type.as_deref(), base64, file_name.as_deref())
        }
        ImageSource::Encoded(image) => {
            let media_type = accept_media_type(&image.media_type, None)?;
            if image.bytes.is_empty() {
                return Err(PipelineError::MalformedImageReference("empty image payload".into()));
            }
            Ok(EncodedImage::new(media_type, image.bytes.clone()))
        }
    }
}

/// Decode a `data:<type>;base64,<payload>` reference.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_reference(
    reference: &str,
    file_name: Option<&str>,
) -> Result<EncodedImage, PipelineError> {
    let (media_type, payload) = split_reference(reference.trim())?;
    let media_type = accept_media_type(media_type, file_name)?;
    let bytes = decode_payload(payload)?;
    Ok(EncodedImage::new(media_type, bytes))
}

/// Decode a pre-split media type and base64 payload.
///
/// A payload that is itself a `data:` reference is decoded as one. A missing
/// media type falls back to the file extension, then to `image/png`.
///
/// # Errors
///
/// See [`decode`].
pub fn decode_parts(
    media_type: Option<&str>,
    payload: &str,
    file_name: Option<&str>,
) -> Result<EncodedImage, PipelineError> {
    let payload = payload.trim();
    if has_data_scheme(payload) {
        return decode_reference(payload, file_name);
    }

    let media_type = match media_type.map(str::trim).filter(|t| !t.is_empty()) {
        Some(declared) => accept_media_type(declared, file_name)?,
        None => extension_media_type(file_name).unwrap_or("image/png"),
    };
    let bytes = decode_payload(payload)?;
    Ok(EncodedImage::new(media_type, bytes))
}

/// Load an image file for an edit request.
///
/// The media type comes from the extension, then from magic bytes. Other
/// decodable containers are transcoded to PNG; accepted ones pass through
/// untouched.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not a recognizable image,
/// or cannot be transcoded.
pub fn load_file(path: &Path) -> Result<EncodedImage, PipelineError> {
    let bytes = std::fs::read(path)?;
    let format = image::ImageFormat::from_path(path)
        .ok()
        .or_else(|| image::guess_format(&bytes).ok())
        .ok_or_else(|| {
            let ext = path.extension().map_or_else(String::new, |e| e.to_string_lossy().into_owned());
            PipelineError::UnsupportedMediaType(if ext.is_empty() { "unknown".into() } else { ext })
        })?;

    let mime = format.to_mime_type();
    if ACCEPTED_MEDIA_TYPES.contains(&mime) {
        return Ok(EncodedImage::new(mime, bytes));
    }

    tracing::debug!(from = mime, "transcoding source image to PNG");
    transcode_to_png(&bytes, format)
}

/// Wrap provider base64 into a canonical PNG `data:` reference without
/// touching the payload.
#[must_use]
pub fn inline_png_reference(b64: &str) -> String {
    format!("data:image/png;base64,{b64}")
}

fn transcode_to_png(
    bytes: &[u8],
    format: image::ImageFormat,
) -> Result<EncodedImage, PipelineError> {
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| PipelineError::ImageConversion(format!("Failed to decode image: {e}")))?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png)
        .map_err(|e| PipelineError::ImageConversion(format!("Failed to encode PNG: {e}")))?;
    Ok(EncodedImage::new("image/png", out.into_inner()))
}

fn has_data_scheme(s: &str) -> bool {
    s.get(..5).is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}

/// Split `data:<type>[;param]*;base64,<payload>` into type and payload.
fn split_reference(reference: &str) -> Result<(&str, &str), PipelineError> {
    let malformed = |why: &str| PipelineError::MalformedImageReference(why.to_string());

    if !has_data_scheme(reference) {
        return Err(malformed("expected a data: reference"));
    }
    let (header, payload) =
        reference[5..].split_once(',').ok_or_else(|| malformed("missing ',' separator"))?;

    let mut params = header.split(';');
    let media_type = params.next().unwrap_or_default().trim();
    if media_type.is_empty() || !media_type.contains('/') {
        return Err(malformed("missing media type"));
    }
    if !params.last().is_some_and(|enc| enc.trim().eq_ignore_ascii_case("base64")) {
        return Err(malformed("only base64 encoding is supported"));
    }
    Ok((media_type, payload))
}

/// Check a declared media type against the allow-list.
///
/// A generic octet-stream is rescued by the file extension when it names an
/// accepted type.
fn accept_media_type(declared: &str, file_name: Option<&str>) -> Result<&'static str, PipelineError> {
    let declared = declared.trim().to_ascii_lowercase();
    if let Some(accepted) = ACCEPTED_MEDIA_TYPES.iter().find(|&&t| t == declared).copied() {
        return Ok(accepted);
    }
    if declared == OCTET_STREAM {
        if let Some(rescued) = extension_media_type(file_name) {
            return Ok(rescued);
        }
    }
    Err(PipelineError::UnsupportedMediaType(declared))
}

fn extension_media_type(file_name: Option<&str>) -> Option<&'static str> {
    let format = image::ImageFormat::from_path(file_name?).ok()?;
    let mime = format.to_mime_type();
    ACCEPTED_MEDIA_TYPES.iter().find(|&&t| t == mime).copied()
}

fn decode_payload(payload: &str) -> Result<Vec<u8>, PipelineError> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(PipelineError::MalformedImageReference("empty image payload".into()));
    }
    LENIENT
        .decode(compact.as_bytes())
        .map_err(|e| PipelineError::MalformedImageReference(format!("invalid base64: {e}")))
}

/// Serde helper for serializing `Vec<u8>` as base64 strings in cassettes.
mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize bytes as base64 string.
    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        serializer.serialize_str(&encoded)
    }

    /// Deserialize base64 string to bytes.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
