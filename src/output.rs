//! File naming and saving of inline result images.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::codec;
use crate::error::PipelineError;
use crate::params::extension_for_media_type;

/// Generate an output filename from the instruction and an extension.
///
/// Sanitizes the first 50 characters of the instruction to kebab-case and
/// appends a unix timestamp.
#[must_use]
pub fn auto_filename(prompt: &str, ext: &str) -> String {
    let sanitized = sanitize_for_filename(prompt, 50);
    let timestamp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs();
    format!("{sanitized}-{timestamp}.{ext}")
}

/// Sanitize a string for use in a filename.
///
/// Lowercases, turns runs of non-alphanumerics into single hyphens, and
/// trims to `max_len`.
#[must_use]
pub fn sanitize_for_filename(input: &str, max_len: usize) -> String {
    let mut result = String::with_capacity(max_len);
    let mut last_was_hyphen = true;

    for ch in input.chars() {
        if result.len() >= max_len {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            result.push('-');
            last_was_hyphen = true;
        }
    }

    while result.ends_with('-') {
        result.pop();
    }

    if result.is_empty() {
        "image".to_string()
    } else {
        result
    }
}

/// Resolve where the `index`-th of `total` images goes.
///
/// An explicit path keeps its name for a single image and gets a `-N` suffix
/// before the extension when there are several.
#[must_use]
pub fn resolve_output_path(
    explicit: Option<&str>,
    prompt: &str,
    ext: &str,
    index: usize,
    total: usize,
) -> PathBuf {
    let base = match explicit {
        Some(p) => PathBuf::from(p),
        None => PathBuf::from(auto_filename(prompt, ext)),
    };
    if total <= 1 {
        return base;
    }
    let stem = base.file_stem().unwrap_or_default().to_string_lossy().into_owned();
    let ext = base
        .extension()
        .map_or_else(|| ext.to_string(), |e| e.to_string_lossy().into_owned());
    base.with_file_name(format!("{stem}-{}.{ext}", index + 1))
}

/// Extension for an inline `data:` reference, from its media type.
///
/// # Errors
///
/// Returns codec errors if the reference cannot be decoded.
pub fn inline_extension(reference: &str) -> Result<&'static str, PipelineError> {
    let image = codec::decode_reference(reference, None)?;
    Ok(extension_for_media_type(&image.media_type))
}

/// Decode an inline `data:` reference and write its bytes as-is.
///
/// # Errors
///
/// Returns codec errors for a bad reference and I/O errors on write.
pub fn save_image(reference: &str, output_path: &Path) -> Result<(), PipelineError> {
    let image = codec::decode_reference(reference, None)?;
    std::fs::write(output_path, &image.bytes)?;
    Ok(())
}
