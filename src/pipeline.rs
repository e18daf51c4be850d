//! The request pipeline: compose, encode, dispatch, normalize.

use std::future::Future;

use crate::boundary::{self, CanonicalResponse};
use crate::codec;
use crate::config::PipelineSettings;
use crate::dispatch::Dispatcher;
use crate::error::PipelineError;
use crate::normalize::{extract_tags, normalize, GenerationResult};
use crate::ports::ImageProvider;
use crate::prompt::PromptConfig;
use crate::request::{GenerationRequest, ImageSource};

/// Owns the provider and the immutable tables for a deployment.
///
/// Holds no per-request state, so one instance can serve concurrent calls.
pub struct Pipeline {
    provider: Box<dyn ImageProvider>,
    prompts: PromptConfig,
    settings: PipelineSettings,
}

impl Pipeline {
    /// Assemble a pipeline.
    #[must_use]
    pub fn new(
        provider: Box<dyn ImageProvider>,
        prompts: PromptConfig,
        settings: PipelineSettings,
    ) -> Self {
        Self { provider, prompts, settings }
    }

    /// Dispatcher borrowing this pipeline's collaborators.
    #[must_use]
    pub fn dispatcher(&self) -> Dispatcher<'_> {
        Dispatcher::new(self.provider.as_ref(), &self.prompts, &self.settings)
    }

    /// Run one request end to end.
    ///
    /// # Errors
    ///
    /// Returns exactly one classified error when no result can be produced.
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, PipelineError> {
        let (outbound, reply) = self.dispatcher().dispatch(request).await?;
        let result = normalize(&reply, outbound.count(), self.settings.excerpt_limit)
            .inspect_err(|e| tracing::warn!(error = %e, "provider reply had no images"))?;
        tracing::info!(mode = outbound.mode(), images = result.count(), "generation finished");
        Ok(result)
    }

    /// Run one request unless `cancel` completes first.
    ///
    /// The in-flight call is dropped on cancellation; nothing needs rolling back.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` when `cancel` wins, otherwise as [`Self::generate`].
    pub async fn generate_until<C>(
        &self,
        request: &GenerationRequest,
        cancel: C,
    ) -> Result<GenerationResult, PipelineError>
    where
        C: Future<Output = ()>,
    {
        tokio::select! {
            result = self.generate(request) => result,
            () = cancel => {
                tracing::debug!("generation cancelled by caller");
                Err(PipelineError::Cancelled)
            }
        }
    }

    /// Describe a source image as short comma-separated tags.
    ///
    /// # Errors
    ///
    /// Returns codec errors for the image and provider errors for the call.
    pub async fn describe(&self, source: &ImageSource) -> Result<String, PipelineError> {
        let image = codec::decode(source)?;
        let reply = self.provider.describe(&image).await?;
        extract_tags(&reply, self.settings.excerpt_limit)
    }

    /// Handle one inbound request body and produce the canonical response.
    pub async fn handle(&self, method: &str, body: &str) -> CanonicalResponse {
        let outcome = match boundary::parse_inbound(method, body) {
            Ok(request) => self.generate(&request).await,
            Err(e) => Err(e),
        };
        CanonicalResponse::from_outcome(&outcome)
    }
}
