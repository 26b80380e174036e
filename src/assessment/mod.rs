//! Pronunciation assessment pipeline
//!
//! This module turns one continuous recognition session into one report:
//! - `RecognitionEventBus` serializes engine callbacks into an ordered stream
//! - `SessionTimer` forces a stop when the session deadline elapses
//! - `SegmentCollector` gathers recognized segments until a terminal event
//! - `AggregationEngine` reduces segments into word-count weighted scores
//! - `AssessmentSession` drives the above and owns the state machine

mod aggregate;
mod bus;
mod collector;
mod config;
mod session;
mod timer;
mod types;

pub use aggregate::AggregationEngine;
pub use bus::{BusHandle, EventStream, RecognitionEventBus};
pub use collector::{Collection, SegmentCollector, TerminalStatus};
pub use config::AssessConfig;
pub use session::{assess, AssessmentSession, SessionOutcome};
pub use timer::{SessionTimer, Watchdog};
pub use types::{
    AggregateReport, Mispronunciation, SegmentResult, SessionState, WordErrorKind, WordResult,
};
