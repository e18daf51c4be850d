//! The pipeline's input: one generation request, built fresh per invocation.

use crate::codec::EncodedImage;

/// Tone and appearance modifiers applied on top of the style preset.
///
/// Each flag maps to one fixed prompt block; see [`crate::prompt`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToneOptions {
    /// Mild global brighten (`lite` / `brightnessUp`).
    pub brighten: bool,
    /// Mild mood intensification.
    pub mood_boost: bool,
    /// Gentle smile.
    pub smile: bool,
    /// Skin and hair touch-up.
    pub clean: bool,
    /// Transparent background.
    pub bg_transparent: bool,
    /// Named background preset.
    pub bg_preset: Option<String>,
    /// Identity preservation in edit mode. `None` means the default (on).
    pub lock_face: Option<bool>,
    /// Push the style preset harder.
    pub strong_style: bool,
}

impl ToneOptions {
    /// Whether the identity-preservation block is wanted.
    #[must_use]
    pub fn locks_face(&self) -> bool {
        self.lock_face != Some(false)
    }
}

/// A source image as it arrived, before the codec has validated it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// An embedded data reference (`data:<type>;base64,<payload>`).
    DataUrl {
        /// The full reference string.
        reference: String,
        /// Original file name, when the uploader sent one.
        file_name: Option<String>,
    },
    /// A pre-split media type and base64 payload.
    Parts {
        /// Declared media type, if any.
        media_type: Option<String>,
        /// Base64 payload.
        base64: String,
        /// Original file name, when the uploader sent one.
        file_name: Option<String>,
    },
    /// Raw bytes already tagged with a media type (e.g. read from disk).
    Encoded(EncodedImage),
}

/// One request to produce stylized images.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Free-text user guidance.
    pub instruction: String,
    /// Style preset key, named or numeric alias.
    pub style_preset: Option<String>,
    /// Tone and appearance modifiers.
    pub tone: ToneOptions,
    /// Present only for edit requests.
    pub source_image: Option<ImageSource>,
    /// Requested number of images; defaults to 1.
    pub batch_size: Option<u32>,
}

impl GenerationRequest {
    /// Create a request carrying only an instruction.
    #[must_use]
    pub fn new(instruction: impl Into<String>) -> Self {
        Self { instruction: instruction.into(), ..Self::default() }
    }

    /// Whether this request edits a source image rather than synthesizing.
    #[must_use]
    pub fn is_edit(&self) -> bool {
        self.source_image.is_some()
    }

    /// Number of images asked for before any provider cap.
    #[must_use]
    pub fn requested_count(&self) -> u32 {
        self.batch_size.unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_face_defaults_on() {
        assert!(ToneOptions::default().locks_face());
        assert!(ToneOptions { lock_face: Some(true), ..ToneOptions::default() }.locks_face());
        assert!(!ToneOptions { lock_face: Some(false), ..ToneOptions::default() }.locks_face());
    }

    #[test]
    fn requested_count_defaults_to_one() {
        assert_eq!(GenerationRequest::new("a cat").requested_count(), 1);
        let zero = GenerationRequest { batch_size: Some(0), ..GenerationRequest::default() };
        assert_eq!(zero.requested_count(), 1);
    }

    #[test]
    fn edit_follows_source_image() {
        let mut request = GenerationRequest::new("a cat");
        assert!(!request.is_edit());
        request.source_image = Some(ImageSource::Parts {
            media_type: Some("image/png".into()),
            base64: "AAAA".into(),
            file_name: None,
        });
        assert!(request.is_edit());
    }
}
