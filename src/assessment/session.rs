use super::aggregate::AggregationEngine;
use super::bus::RecognitionEventBus;
use super::collector::{SegmentCollector, TerminalStatus};
use super::config::AssessConfig;
use super::timer::SessionTimer;
use super::types::{AggregateReport, SessionState};
use crate::audio::AudioClip;
use crate::config::EngineConfig;
use crate::engine::{EngineFactory, RecognitionEngine, RecognitionRequest};
use crate::error::{AssessError, AssessResult};
use tracing::{error, info, warn};

/// Terminal state and result of one assessment
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub state: SessionState,
    pub result: AssessResult<AggregateReport>,
}

impl SessionOutcome {
    pub fn into_result(self) -> AssessResult<AggregateReport> {
        self.result
    }
}

/// One pronunciation assessment over one engine session
///
/// Created per call and consumed by [`AssessmentSession::run`]; the engine
/// is released on every path out of `run`.
pub struct AssessmentSession {
    session_id: String,
    bus: RecognitionEventBus,
    config: AssessConfig,
    state: SessionState,
}

impl AssessmentSession {
    pub fn new(engine: Box<dyn RecognitionEngine>, config: AssessConfig) -> Self {
        Self {
            session_id: format!("assessment-{}", uuid::Uuid::new_v4()),
            bus: RecognitionEventBus::new(engine),
            config,
            state: SessionState::Idle,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn transition(&mut self, next: SessionState) {
        info!("Session {}: {:?} -> {:?}", self.session_id, self.state, next);
        self.state = next;
    }

    fn finish(mut self, result: AssessResult<AggregateReport>) -> SessionOutcome {
        // Release is idempotent; this covers paths that never reached Stopping
        self.bus.stop();
        if let Err(e) = &result {
            error!("Session {} failed: {}", self.session_id, e);
            self.transition(SessionState::Failed);
        }
        SessionOutcome {
            state: self.state,
            result,
        }
    }

    /// Assess `audio` against `reference_text`
    pub async fn run(mut self, audio: AudioClip, reference_text: &str) -> SessionOutcome {
        info!(
            "Starting assessment {} with {} engine: clip {} ({:.1}s)",
            self.session_id,
            self.bus.engine_name(),
            audio.id,
            audio.duration_seconds()
        );

        self.transition(SessionState::Listening);

        let handle = self.bus.handle();
        let watchdog = SessionTimer::watchdog_for(self.config.timeout, move || handle.stop());

        let request = RecognitionRequest {
            audio,
            reference_text: reference_text.to_string(),
        };

        // The watchdog also bounds start; a stalled start yields an ended stream
        let stream = match self.bus.start(request).await {
            Ok(stream) => stream,
            Err(e) => {
                watchdog.cancel();
                return self.finish(Err(AssessError::EngineUnavailable(format!("{:#}", e))));
            }
        };

        let collection = SegmentCollector::new().drain(stream.into_stream()).await;

        self.transition(SessionState::Stopping);
        let fired = watchdog.cancel();
        self.bus.stop();

        let partial = match &collection.status {
            TerminalStatus::Canceled(reason) => {
                return self.finish(Err(AssessError::EngineCanceled(reason.clone())));
            }
            TerminalStatus::Interrupted if fired => {
                warn!(
                    "Session {} timed out after {:?} with {} segment(s); scoring partial result",
                    self.session_id,
                    self.config.timeout,
                    collection.segments.len()
                );
                self.transition(SessionState::TimedOut);
                true
            }
            TerminalStatus::Interrupted => {
                warn!(
                    "Session {}: engine ended without a terminal event",
                    self.session_id
                );
                self.transition(SessionState::Done);
                false
            }
            TerminalStatus::Stopped => {
                self.transition(SessionState::Done);
                false
            }
        };

        let result = collection.into_segments().and_then(|segments| {
            AggregationEngine::new(self.config.mispronunciation_threshold)
                .aggregate(&segments, partial)
        });

        if let Ok(report) = &result {
            info!(
                "Session {} scored: total {:.1} (pron {:.1}, acc {:.1}, flu {:.1}, pros {:.1}), {} flagged{}",
                self.session_id,
                report.total_score,
                report.pronunciation_score,
                report.accuracy_score,
                report.fluency_score,
                report.prosody_score,
                report.mispronunciations.len(),
                if report.partial { ", partial" } else { "" }
            );
        }

        self.finish(result)
    }
}

/// Build the configured engine and assess `audio` against `reference_text`
pub async fn assess(
    engine: &EngineConfig,
    audio: AudioClip,
    reference_text: &str,
    config: AssessConfig,
) -> AssessResult<AggregateReport> {
    let engine = EngineFactory::create(engine)?;
    AssessmentSession::new(engine, config)
        .run(audio, reference_text)
        .await
        .into_result()
}
