//! Word-count weighted reduction of segment scores
//!
//! Each segment contributes to the four score means in proportion to its
//! number of word results. Segments without word results keep their text in
//! the transcript but are left out of every mean entirely.

use super::types::{AggregateReport, Mispronunciation, SegmentResult, WordErrorKind};
use crate::error::{AssessError, AssessResult};
use tracing::debug;

/// Reduces collected segments into a single report
#[derive(Debug, Clone)]
pub struct AggregationEngine {
    mispronunciation_threshold: f64,
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl AggregationEngine {
    /// `threshold`: words with accuracy strictly below it are flagged
    pub fn new(threshold: f64) -> Self {
        Self {
            mispronunciation_threshold: threshold,
        }
    }

    pub fn aggregate(
        &self,
        segments: &[SegmentResult],
        partial: bool,
    ) -> AssessResult<AggregateReport> {
        if segments.is_empty() {
            return Err(AssessError::NoSpeechRecognized);
        }

        let total_words: usize = segments.iter().map(SegmentResult::word_count).sum();
        if total_words == 0 {
            return Err(AssessError::NoWordsDetected);
        }

        let weighted_mean = |score: fn(&SegmentResult) -> f64| -> f64 {
            let sum: f64 = segments
                .iter()
                .filter(|s| s.word_count() > 0)
                .map(|s| score(s) * s.word_count() as f64)
                .sum();
            sum / total_words as f64
        };

        let pronunciation_score = weighted_mean(|s| s.pronunciation_score);
        let accuracy_score = weighted_mean(|s| s.accuracy_score);
        let fluency_score = weighted_mean(|s| s.fluency_score);
        let prosody_score = weighted_mean(|s| s.prosody_score);

        let recognized_text = segments
            .iter()
            .map(|s| s.recognized_text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        let mispronunciations: Vec<Mispronunciation> = segments
            .iter()
            .flat_map(|s| s.words.iter())
            .filter(|w| {
                w.error_kind == WordErrorKind::Mispronunciation
                    || w.accuracy_score < self.mispronunciation_threshold
            })
            .map(|w| Mispronunciation {
                word: w.text.clone(),
                accuracy_score: w.accuracy_score,
                error_kind: w.error_kind,
            })
            .collect();

        debug!(
            "Aggregated {} segments ({} words), {} flagged",
            segments.len(),
            total_words,
            mispronunciations.len()
        );

        Ok(AggregateReport {
            pronunciation_score,
            accuracy_score,
            fluency_score,
            prosody_score,
            total_score: pronunciation_score + accuracy_score + fluency_score + prosody_score,
            recognized_text,
            mispronunciations,
            partial,
            segment_count: segments.len(),
            word_count: total_words,
        })
    }
}
