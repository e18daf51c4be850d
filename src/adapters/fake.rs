//! In-memory provider for unit tests.

use std::sync::Mutex;

use crate::codec::EncodedImage;
use crate::error::PipelineError;
use crate::ports::image_provider::{ImageProvider, ProviderFuture, ProviderReply, ProviderRequest};

/// Answers every call with the same canned outcome and remembers requests.
pub struct FakeProvider {
    outcome: Result<ProviderReply, String>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl FakeProvider {
    /// Reply with the given status and body.
    pub fn replying(status: u16, body: &str) -> Self {
        Self::with_outcome(Ok(ProviderReply { status, body: body.to_string() }))
    }

    /// Fail every call at the transport level.
    pub fn unreachable(message: &str) -> Self {
        Self::with_outcome(Err(message.to_string()))
    }

    fn with_outcome(outcome: Result<ProviderReply, String>) -> Self {
        Self { outcome, requests: Mutex::new(Vec::new()) }
    }

    /// Number of `send` calls so far.
    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// The most recent request passed to `send`.
    pub fn last_request(&self) -> Option<ProviderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    fn reply(&self) -> ProviderFuture<'_> {
        let outcome = self.outcome.clone().map_err(PipelineError::UpstreamUnreachable);
        Box::pin(async move { outcome })
    }
}

impl ImageProvider for FakeProvider {
    fn send(&self, request: &ProviderRequest) -> ProviderFuture<'_> {
        self.requests.lock().unwrap().push(request.clone());
        self.reply()
    }

    fn describe(&self, _image: &EncodedImage) -> ProviderFuture<'_> {
        self.reply()
    }
}
