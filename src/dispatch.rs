//! Mode dispatch: choose synthesis or edit, build the provider request, and
//! make the single outbound call.

use crate::codec;
use crate::config::PipelineSettings;
use crate::error::PipelineError;
use crate::normalize::rejection;
use crate::params::clamp_count;
use crate::ports::{ImageProvider, ProviderReply, ProviderRequest};
use crate::prompt::{BlockKind, PromptConfig};
use crate::request::GenerationRequest;

/// Builds provider requests and sends them through an [`ImageProvider`].
pub struct Dispatcher<'a> {
    provider: &'a dyn ImageProvider,
    prompts: &'a PromptConfig,
    settings: &'a PipelineSettings,
}

impl<'a> Dispatcher<'a> {
    /// Create a dispatcher over borrowed collaborators.
    #[must_use]
    pub fn new(
        provider: &'a dyn ImageProvider,
        prompts: &'a PromptConfig,
        settings: &'a PipelineSettings,
    ) -> Self {
        Self { provider, prompts, settings }
    }

    /// Build the provider request for a generation request.
    ///
    /// # Errors
    ///
    /// Returns `MissingInput` when neither instruction nor a known preset is
    /// given, and codec errors for a bad source image.
    pub fn build(&self, request: &GenerationRequest) -> Result<ProviderRequest, PipelineError> {
        build_request(request, self.prompts, self.settings)
    }

    /// Build and send one request. Non-2xx replies are classified here.
    ///
    /// Returns the outbound request with the reply so callers know the
    /// clamped count.
    ///
    /// # Errors
    ///
    /// Returns build errors, `UpstreamUnreachable` on transport failure, and
    /// `UpstreamRejected` on a non-success status.
    pub async fn dispatch(
        &self,
        request: &GenerationRequest,
    ) -> Result<(ProviderRequest, ProviderReply), PipelineError> {
        let outbound = self.build(request)?;
        let reply = send(self.provider, &outbound, self.settings.excerpt_limit).await?;
        Ok((outbound, reply))
    }
}

/// Reject requests that would compose to no meaningful content.
///
/// # Errors
///
/// Returns `MissingInput` when the instruction is blank and the preset is
/// absent or unknown.
pub fn check_input(request: &GenerationRequest, prompts: &PromptConfig) -> Result<(), PipelineError> {
    let has_instruction = !request.instruction.trim().is_empty();
    let has_preset =
        request.style_preset.as_deref().is_some_and(|key| prompts.resolve_preset(key).is_some());
    if has_instruction || has_preset {
        Ok(())
    } else {
        Err(PipelineError::MissingInput)
    }
}

/// Build the provider request. The mode is decided by `source_image` alone.
///
/// # Errors
///
/// See [`Dispatcher::build`].
pub fn build_request(
    request: &GenerationRequest,
    prompts: &PromptConfig,
    settings: &PipelineSettings,
) -> Result<ProviderRequest, PipelineError> {
    check_input(request, prompts)?;

    let composed = prompts.compose(
        &request.instruction,
        request.style_preset.as_deref(),
        &request.tone,
        request.is_edit(),
    );
    tracing::debug!(
        blocks = composed.blocks().len(),
        identity_lock = composed.contains(BlockKind::Identity),
        "prompt composed"
    );
    let prompt = composed.text();
    let size = settings.size.clone();
    let quality = settings.quality.clone();

    match request.source_image {
        None => {
            let count = clamp_count(request.requested_count(), settings.synthesis_max_count);
            Ok(ProviderRequest::Synthesis { prompt, size, quality, count })
        }
        Some(ref source) => {
            let image = codec::decode(source)?;
            let count = clamp_count(request.requested_count(), settings.edit_max_count);
            Ok(ProviderRequest::Edit { prompt, size, quality, count, image })
        }
    }
}

/// Make the single outbound call and classify a non-success status.
///
/// # Errors
///
/// See [`Dispatcher::dispatch`].
pub async fn send(
    provider: &dyn ImageProvider,
    request: &ProviderRequest,
    excerpt_limit: usize,
) -> Result<ProviderReply, PipelineError> {
    tracing::debug!(
        mode = request.mode(),
        count = request.count(),
        prompt_len = request.prompt().len(),
        "dispatching to provider"
    );

    let reply = provider.send(request).await.inspect_err(|e| {
        tracing::warn!(error = %e, "provider unreachable");
    })?;
    tracing::debug!(status = reply.status, "provider replied");

    if !reply.is_success() {
        let err = rejection(&reply, excerpt_limit);
        tracing::warn!(error = %err, "provider rejected request");
        return Err(err);
    }
    Ok(reply)
}
