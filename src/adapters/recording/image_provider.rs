//! Recording adapter for the `ImageProvider` port.

use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::{image_summary, record_reply};
use crate::cassette::recorder::CassetteRecorder;
use crate::codec::EncodedImage;
use crate::ports::image_provider::{ImageProvider, ProviderFuture, ProviderRequest};

/// Records provider interactions while delegating to an inner implementation.
pub struct RecordingImageProvider {
    inner: Box<dyn ImageProvider>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingImageProvider {
    /// Creates a new recording provider wrapping the given implementation.
    pub fn new(inner: Box<dyn ImageProvider>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

fn request_input(request: &ProviderRequest) -> Value {
    let mut input = serde_json::to_value(request).unwrap_or_default();
    if let ProviderRequest::Edit { ref image, .. } = *request {
        input["image"] = image_summary(image);
    }
    input
}

impl ImageProvider for RecordingImageProvider {
    fn send(&self, request: &ProviderRequest) -> ProviderFuture<'_> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.send(&request).await;
            record_reply(&self.recorder, "send", request_input(&request), &result);
            result
        })
    }

    fn describe(&self, image: &EncodedImage) -> ProviderFuture<'_> {
        let image = image.clone();
        Box::pin(async move {
            let result = self.inner.describe(&image).await;
            record_reply(&self.recorder, "describe", image_summary(&image), &result);
            result
        })
    }
}
