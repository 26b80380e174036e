use serde::{Deserialize, Serialize};

/// Error classification the recognizer attaches to a single word
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WordErrorKind {
    #[default]
    None,
    Mispronunciation,
    Omission,
    Insertion,
    Other,
}

impl WordErrorKind {
    /// Map the recognizer's `ErrorType` label onto a kind
    pub fn from_label(label: &str) -> Self {
        match label {
            "" | "None" => Self::None,
            "Mispronunciation" => Self::Mispronunciation,
            "Omission" => Self::Omission,
            "Insertion" => Self::Insertion,
            _ => Self::Other,
        }
    }
}

/// Word-level result inside a recognized segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordResult {
    pub text: String,

    /// Accuracy on a 0-100 scale
    pub accuracy_score: f64,

    #[serde(default)]
    pub error_kind: WordErrorKind,
}

/// One recognized utterance with its pronunciation scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentResult {
    pub recognized_text: String,

    #[serde(default)]
    pub words: Vec<WordResult>,

    pub pronunciation_score: f64,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub prosody_score: f64,
}

impl SegmentResult {
    /// Aggregation weight of this segment
    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

/// A word flagged as mispronounced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mispronunciation {
    pub word: String,
    pub accuracy_score: f64,
    pub error_kind: WordErrorKind,
}

/// Final output of one assessment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    pub pronunciation_score: f64,
    pub accuracy_score: f64,
    pub fluency_score: f64,
    pub prosody_score: f64,

    /// Sum of the four weighted means
    pub total_score: f64,

    pub recognized_text: String,
    pub mispronunciations: Vec<Mispronunciation>,

    /// Set when the session deadline cut recognition short
    pub partial: bool,

    /// Number of segments observed, including zero-word ones
    pub segment_count: usize,

    /// Total aggregation weight
    pub word_count: usize,
}

/// Lifecycle of one assessment session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    Idle,
    Listening,
    Stopping,
    Done,
    TimedOut,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::TimedOut | Self::Failed)
    }
}
