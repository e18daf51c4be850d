//! Provider parameter validation and media-type helpers.

/// Output sizes the image provider accepts.
const VALID_SIZES: &[&str] = &["1024x1024", "1536x1024", "1024x1536", "auto"];

/// Quality tiers the image provider accepts.
const VALID_QUALITIES: &[&str] = &["auto", "low", "medium", "high"];

/// Validate the pinned output size.
///
/// # Errors
///
/// Returns an error if the size is not recognized.
pub fn validate_size(size: &str) -> Result<(), String> {
    if VALID_SIZES.contains(&size) {
        Ok(())
    } else {
        Err(format!("Unsupported size '{size}'. Valid: {}", VALID_SIZES.join(", ")))
    }
}

/// Validate the quality tier.
///
/// # Errors
///
/// Returns an error if the quality value is not recognized.
pub fn validate_quality(quality: &str) -> Result<(), String> {
    if VALID_QUALITIES.contains(&quality) {
        Ok(())
    } else {
        Err(format!("Unsupported quality '{quality}'. Valid: {}", VALID_QUALITIES.join(", ")))
    }
}

/// Validate a provider count cap.
///
/// # Errors
///
/// Returns an error if the cap is zero.
pub fn validate_max_count(name: &str, max: u32) -> Result<(), String> {
    if max == 0 {
        Err(format!("{name} must be at least 1"))
    } else {
        Ok(())
    }
}

/// Clamp a requested image count into `1..=max`.
#[must_use]
pub fn clamp_count(requested: u32, max: u32) -> u32 {
    requested.clamp(1, max.max(1))
}

/// Get the file extension for an image media type.
#[must_use]
pub fn extension_for_media_type(media_type: &str) -> &'static str {
    match media_type {
        "image/png" => "png",
        "image/webp" => "webp",
        // jpeg and any unknown type default to jpg
        _ => "jpg",
    }
}
