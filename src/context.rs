//! Service context that selects the provider adapter for a run.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::adapters::live::openai::OpenAiProvider;
use crate::adapters::recording::image_provider::RecordingImageProvider;
use crate::adapters::replaying::image_provider::ReplayingImageProvider;
use crate::cassette::recorder::CassetteRecorder;
use crate::cassette::replayer::CassetteReplayer;
use crate::config::Config;
use crate::error::PipelineError;
use crate::ports::ImageProvider;

/// Holds the provider the pipeline will talk to.
pub struct ServiceContext {
    /// Image provider port.
    pub provider: Box<dyn ImageProvider>,
}

/// Handle to a recording session that must be finished after use.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Finish the recording and write the cassette to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider still holds the recorder or the file
    /// cannot be written.
    pub fn finish(self) -> Result<PathBuf, String> {
        let recorder = Arc::try_unwrap(self.recorder)
            .map_err(|_| "Recording adapter still has references".to_string())?
            .into_inner()
            .map_err(|e| format!("Recorder lock poisoned: {e}"))?;
        recorder.finish().map_err(|e| format!("Failed to write cassette: {e}"))
    }
}

impl ServiceContext {
    /// Live context talking to `OpenAI`.
    ///
    /// # Errors
    ///
    /// Returns `MissingApiKey` if no key is configured.
    pub fn live(config: &Config) -> Result<Self, PipelineError> {
        let key = config.openai_key().ok_or(PipelineError::MissingApiKey {
            provider: "OpenAI".into(),
            env_var: "OPENAI_API_KEY".into(),
        })?;
        Ok(Self { provider: Box::new(OpenAiProvider::new(key, &config.pipeline)) })
    }

    /// Live context whose provider calls are recorded to a cassette.
    ///
    /// # Errors
    ///
    /// See [`Self::live`].
    pub fn recording(config: &Config) -> Result<(Self, RecordingSession), PipelineError> {
        let live = Self::live(config)?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let path = PathBuf::from(".stylegen/cassettes")
            .join(&timestamp)
            .join("image_provider.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-image_provider"),
            get_commit_hash(),
        )));
        tracing::info!(session = %timestamp, "recording provider interactions");

        let provider = RecordingImageProvider::new(live.provider, Arc::clone(&recorder));
        Ok((Self { provider: Box::new(provider) }, RecordingSession { recorder }))
    }

    /// Context that replays a cassette; needs no key and no network.
    ///
    /// # Errors
    ///
    /// Returns a config error if the cassette cannot be loaded.
    pub fn replaying(path: &Path) -> Result<Self, PipelineError> {
        let replayer = CassetteReplayer::load(path)
            .map_err(|e| PipelineError::Config(format!("Failed to load cassette: {e}")))?;
        tracing::info!(cassette = %path.display(), "replaying provider interactions");
        let provider = ReplayingImageProvider::new(Arc::new(Mutex::new(replayer)));
        Ok(Self { provider: Box::new(provider) })
    }
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}
