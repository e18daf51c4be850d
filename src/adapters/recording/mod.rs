//! Recording adapters that capture interactions to cassettes.

pub mod image_provider;

use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::cassette::recorder::CassetteRecorder;
use crate::codec::EncodedImage;
use crate::error::PipelineError;
use crate::ports::ProviderReply;

/// Record a provider call using the Ok/Err JSON convention.
pub(crate) fn record_reply(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    method: &str,
    input: Value,
    result: &Result<ProviderReply, PipelineError>,
) {
    let output = match result {
        Ok(reply) => json!({ "Ok": reply }),
        Err(e) => json!({ "Err": e.to_string() }),
    };

    match recorder.lock() {
        Ok(mut guard) => guard.record("image_provider", method, input, output),
        Err(e) => tracing::warn!(error = %e, "recorder lock poisoned; interaction dropped"),
    }
}

/// Image bytes are summarized rather than stored.
pub(crate) fn image_summary(image: &EncodedImage) -> Value {
    json!({ "media_type": image.media_type, "len": image.bytes.len() })
}
