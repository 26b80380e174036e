use super::events::EngineSink;
use crate::audio::AudioClip;
use crate::config::{EngineConfig, EngineKind};
use crate::error::{AssessError, AssessResult};
use anyhow::Result;
use tracing::info;

/// Input for one recognition session
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    /// Decoded mono audio at the engine's sample rate
    pub audio: AudioClip,
    /// Text the speaker was asked to read
    pub reference_text: String,
}

/// Continuous speech recognition engine with pronunciation scoring
///
/// Implementations:
/// - Azure: Speech service REST API, one request per audio window
/// - Replay: scripted events (offline runs and tests)
#[async_trait::async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Begin recognition in the background
    ///
    /// Results are reported through `sink` as they arrive. Returns once the
    /// session is running, not when it finishes.
    async fn start(&self, request: RecognitionRequest, sink: EngineSink) -> Result<()>;

    /// Stop recognition and release engine resources
    ///
    /// Must not block and must tolerate repeated calls.
    fn stop(&self);

    /// Get engine name for logging
    fn name(&self) -> &str;
}

/// Recognition engine factory
pub struct EngineFactory;

impl EngineFactory {
    /// Create the configured engine
    pub fn create(config: &EngineConfig) -> AssessResult<Box<dyn RecognitionEngine>> {
        match config.kind {
            EngineKind::Azure => {
                let key = config.resolved_key().ok_or_else(|| {
                    AssessError::EngineUnavailable(format!(
                        "{} missing",
                        crate::config::SPEECH_KEY_ENV
                    ))
                })?;

                let engine = super::azure::AzureEngine::new(config, key)
                    .map_err(|e| AssessError::EngineUnavailable(format!("{:#}", e)))?;

                info!("Created Azure engine (region={})", config.region);
                Ok(Box::new(engine))
            }

            EngineKind::Replay => {
                let path = config.replay_script.as_ref().ok_or_else(|| {
                    AssessError::EngineUnavailable("replay script path not configured".to_string())
                })?;

                let engine = super::replay::ReplayEngine::from_file(path)
                    .map_err(|e| AssessError::EngineUnavailable(format!("{:#}", e)))?;

                info!("Created replay engine from {}", path.display());
                Ok(Box::new(engine))
            }
        }
    }
}
