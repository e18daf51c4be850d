//! Replaying adapters that serve recorded interactions from cassettes.

pub mod image_provider;

use std::sync::{Arc, Mutex};

use serde_json::Value;

use crate::cassette::replayer::CassetteReplayer;
use crate::error::PipelineError;
use crate::ports::ProviderReply;

/// Take the next recorded output for a method and turn it back into a reply.
///
/// Recorded `Err` outputs and an exhausted cassette both surface as
/// `UpstreamUnreachable`.
pub(crate) fn replay_reply(
    replayer: &Arc<Mutex<CassetteReplayer>>,
    method: &str,
) -> Result<ProviderReply, PipelineError> {
    let output = {
        let mut guard = replayer
            .lock()
            .map_err(|e| PipelineError::UpstreamUnreachable(format!("replayer lock poisoned: {e}")))?;
        guard
            .next_interaction("image_provider", method)
            .map_err(PipelineError::UpstreamUnreachable)?
            .output
    };

    if let Some(err) = output.get("Err").or_else(|| output.get("err")) {
        let message = err.as_str().unwrap_or("replayed error").to_string();
        return Err(PipelineError::UpstreamUnreachable(message));
    }
    let ok = output.get("Ok").or_else(|| output.get("ok")).cloned().unwrap_or(output);
    serde_json::from_value::<ProviderReply>(ok).map_err(|e| {
        PipelineError::UpstreamUnreachable(format!("unreadable cassette output: {e}"))
    })
}
