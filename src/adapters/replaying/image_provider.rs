//! Replaying adapter for the `ImageProvider` port.

use std::sync::{Arc, Mutex};

use super::replay_reply;
use crate::cassette::replayer::CassetteReplayer;
use crate::codec::EncodedImage;
use crate::ports::image_provider::{ImageProvider, ProviderFuture, ProviderRequest};

/// Serves recorded provider replies from a cassette.
pub struct ReplayingImageProvider {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingImageProvider {
    /// Create a replaying provider backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }
}

impl ImageProvider for ReplayingImageProvider {
    fn send(&self, _request: &ProviderRequest) -> ProviderFuture<'_> {
        let reply = replay_reply(&self.replayer, "send");
        Box::pin(async move { reply })
    }

    fn describe(&self, _image: &EncodedImage) -> ProviderFuture<'_> {
        let reply = replay_reply(&self.replayer, "describe");
        Box::pin(async move { reply })
    }
}
