use thiserror::Error;

/// Result type for assessment operations
pub type AssessResult<T> = std::result::Result<T, AssessError>;

/// Failures an assessment can end with
///
/// A deadline expiry is not listed here: it yields a report tagged `partial`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssessError {
    /// The recognition engine could not be constructed or started
    #[error("Recognition engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The engine canceled the session mid-stream
    #[error("Recognition canceled by engine: {0}")]
    EngineCanceled(String),

    /// Nothing was transcribed before the session ended
    #[error("No speech recognized")]
    NoSpeechRecognized,

    /// Segments were transcribed but none carried word-level results
    #[error("No words detected in speech")]
    NoWordsDetected,
}

/// Payload-free discriminant of [`AssessError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    EngineUnavailable,
    EngineCanceled,
    NoSpeechRecognized,
    NoWordsDetected,
}

impl AssessError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EngineUnavailable(_) => ErrorKind::EngineUnavailable,
            Self::EngineCanceled(_) => ErrorKind::EngineCanceled,
            Self::NoSpeechRecognized => ErrorKind::NoSpeechRecognized,
            Self::NoWordsDetected => ErrorKind::NoWordsDetected,
        }
    }
}
