use super::types::SegmentResult;
use crate::engine::{CancellationReason, RecognitionEvent};
use crate::error::{AssessError, AssessResult};
use futures::stream::{Stream, StreamExt};
use tracing::{debug, info, warn};

/// How the event stream ended
#[derive(Debug, Clone, PartialEq)]
pub enum TerminalStatus {
    /// The engine reported the end of the session
    Stopped,
    /// The stream closed without a terminal event (bus stopped or engine gone)
    Interrupted,
    /// The engine canceled with an error
    Canceled(String),
}

/// Segments observed during one session, in arrival order
#[derive(Debug, Clone)]
pub struct Collection {
    pub segments: Vec<SegmentResult>,
    pub status: TerminalStatus,
}

impl Collection {
    /// The collected segments, or `NoSpeechRecognized` if there are none
    pub fn into_segments(self) -> AssessResult<Vec<SegmentResult>> {
        if self.segments.is_empty() {
            return Err(AssessError::NoSpeechRecognized);
        }
        Ok(self.segments)
    }
}

/// Accumulates recognized segments until the session ends
#[derive(Debug, Default)]
pub struct SegmentCollector {
    segments: Vec<SegmentResult>,
}

impl SegmentCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, segment: SegmentResult) {
        if segment.word_count() == 0 {
            debug!(
                "Segment without word results: {:?} (kept for text only)",
                segment.recognized_text
            );
        }
        self.segments.push(segment);
    }

    /// Consume events until a terminal event or the end of the stream
    pub async fn drain<S>(mut self, mut events: S) -> Collection
    where
        S: Stream<Item = RecognitionEvent> + Unpin,
    {
        let status = loop {
            match events.next().await {
                Some(RecognitionEvent::SegmentRecognized(segment)) => {
                    info!(
                        "Segment {} recognized: {:?} ({} words)",
                        self.segments.len(),
                        segment.recognized_text,
                        segment.word_count()
                    );
                    self.push(segment);
                }
                Some(RecognitionEvent::SessionStopped) => {
                    info!("Recognition session stopped");
                    break TerminalStatus::Stopped;
                }
                Some(RecognitionEvent::Canceled(CancellationReason::EndOfStream)) => {
                    info!("Recognition reached end of audio");
                    break TerminalStatus::Stopped;
                }
                Some(RecognitionEvent::Canceled(reason)) => {
                    warn!("Recognition canceled: {}", reason);
                    break TerminalStatus::Canceled(reason.to_string());
                }
                None => {
                    debug!("Event stream closed without a terminal event");
                    break TerminalStatus::Interrupted;
                }
            }
        };

        Collection {
            segments: self.segments,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn segment(text: &str, words: usize) -> SegmentResult {
        SegmentResult {
            recognized_text: text.to_string(),
            words: (0..words)
                .map(|i| crate::assessment::WordResult {
                    text: format!("w{}", i),
                    accuracy_score: 90.0,
                    error_kind: crate::assessment::WordErrorKind::None,
                })
                .collect(),
            pronunciation_score: 80.0,
            accuracy_score: 80.0,
            fluency_score: 80.0,
            prosody_score: 80.0,
        }
    }

    #[tokio::test]
    async fn test_collects_until_session_stopped() {
        let events = stream::iter(vec![
            RecognitionEvent::SegmentRecognized(segment("one", 2)),
            RecognitionEvent::SegmentRecognized(segment("", 0)),
            RecognitionEvent::SegmentRecognized(segment("two", 3)),
            RecognitionEvent::SessionStopped,
            RecognitionEvent::SegmentRecognized(segment("late", 1)),
        ]);

        let collection = SegmentCollector::new().drain(events).await;
        assert_eq!(collection.status, TerminalStatus::Stopped);

        let texts: Vec<&str> = collection
            .segments
            .iter()
            .map(|s| s.recognized_text.as_str())
            .collect();
        assert_eq!(texts, vec!["one", "", "two"]);
    }

    #[tokio::test]
    async fn test_end_of_stream_cancel_is_clean_stop() {
        let events = stream::iter(vec![
            RecognitionEvent::SegmentRecognized(segment("one", 2)),
            RecognitionEvent::Canceled(CancellationReason::EndOfStream),
        ]);

        let collection = SegmentCollector::new().drain(events).await;
        assert_eq!(collection.status, TerminalStatus::Stopped);
        assert_eq!(collection.segments.len(), 1);
    }

    #[tokio::test]
    async fn test_error_cancel_reported() {
        let events = stream::iter(vec![RecognitionEvent::Canceled(CancellationReason::Error {
            code: "401".to_string(),
            details: "bad key".to_string(),
        })]);

        let collection = SegmentCollector::new().drain(events).await;
        assert_eq!(
            collection.status,
            TerminalStatus::Canceled("401: bad key".to_string())
        );
    }

    #[tokio::test]
    async fn test_closed_stream_is_interrupted() {
        let events = stream::iter(vec![RecognitionEvent::SegmentRecognized(segment("one", 1))]);

        let collection = SegmentCollector::new().drain(events).await;
        assert_eq!(collection.status, TerminalStatus::Interrupted);
        assert_eq!(collection.segments.len(), 1);
    }

    #[tokio::test]
    async fn test_no_segments_is_no_speech() {
        let events = stream::iter(vec![RecognitionEvent::SessionStopped]);

        let collection = SegmentCollector::new().drain(events).await;
        assert_eq!(
            collection.into_segments(),
            Err(AssessError::NoSpeechRecognized)
        );
    }
}
