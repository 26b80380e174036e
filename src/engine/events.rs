use crate::assessment::SegmentResult;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tracing::debug;

/// Why the engine canceled a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationReason {
    /// The engine consumed all of its audio
    EndOfStream,
    /// Transport, authentication or service failure
    Error { code: String, details: String },
}

impl std::fmt::Display for CancellationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfStream => write!(f, "end of stream"),
            Self::Error { code, details } => write!(f, "{}: {}", code, details),
        }
    }
}

/// Typed event delivered by a recognition session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionEvent {
    SegmentRecognized(SegmentResult),
    SessionStopped,
    Canceled(CancellationReason),
}

impl RecognitionEvent {
    /// Whether this event ends the session
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::SegmentRecognized(_))
    }
}

/// Callback handle an engine uses to report results
///
/// Cloneable and usable from any thread or task. Events sent after the
/// owning bus has been stopped are dropped.
#[derive(Debug, Clone)]
pub struct EngineSink {
    tx: mpsc::UnboundedSender<RecognitionEvent>,
    stopped: watch::Receiver<bool>,
}

impl EngineSink {
    pub(crate) fn new(
        tx: mpsc::UnboundedSender<RecognitionEvent>,
        stopped: watch::Receiver<bool>,
    ) -> Self {
        Self { tx, stopped }
    }

    /// Deliver an event; returns false if it was dropped
    pub fn emit(&self, event: RecognitionEvent) -> bool {
        if *self.stopped.borrow() {
            debug!("Dropping event after stop: {:?}", event);
            return false;
        }
        self.tx.send(event).is_ok()
    }

    pub fn recognized(&self, segment: SegmentResult) -> bool {
        self.emit(RecognitionEvent::SegmentRecognized(segment))
    }

    pub fn session_stopped(&self) -> bool {
        self.emit(RecognitionEvent::SessionStopped)
    }

    pub fn canceled(&self, reason: CancellationReason) -> bool {
        self.emit(RecognitionEvent::Canceled(reason))
    }

    /// Whether the owning bus has been stopped
    pub fn is_stopped(&self) -> bool {
        *self.stopped.borrow()
    }
}
