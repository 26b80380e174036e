pub mod assessment;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod report;

pub use assessment::{
    assess, AggregateReport, AggregationEngine, AssessConfig, AssessmentSession,
    Mispronunciation, RecognitionEventBus, SegmentCollector, SegmentResult, SessionOutcome,
    SessionState, SessionTimer, WordErrorKind, WordResult,
};
pub use audio::{encode_wav, AudioClip};
pub use config::{Config, EngineConfig, EngineKind};
pub use engine::{
    AzureEngine, CancellationReason, EngineFactory, EngineSink, RecognitionEngine,
    RecognitionEvent, RecognitionRequest, ReplayEngine, ReplayScript,
};
pub use error::{AssessError, AssessResult, ErrorKind};
pub use report::{AssessmentSource, JsonLinesSink, ReportRecord, ReportSink, SpeechType};
