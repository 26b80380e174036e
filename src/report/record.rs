use crate::assessment::AggregateReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What triggered the assessment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentSource {
    Flashcard,
    Shadowing,
}

/// Register of the recorded speech
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SpeechType {
    Formal,
    Informal,
    Shadowing,
}

/// A report as handed to a sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub audio_id: String,
    pub source: AssessmentSource,
    pub speech_type: SpeechType,

    #[serde(flatten)]
    pub report: AggregateReport,

    /// Reserved for prosody feedback; always an empty object for now
    pub prosody_issues: serde_json::Value,

    /// Path of a rendered markdown report, if one was written
    pub report_md_path: Option<String>,
}

impl ReportRecord {
    pub fn new(
        audio_id: impl Into<String>,
        source: AssessmentSource,
        speech_type: SpeechType,
        report: AggregateReport,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            audio_id: audio_id.into(),
            source,
            speech_type,
            report,
            prosody_issues: serde_json::Value::Object(serde_json::Map::new()),
            report_md_path: None,
        }
    }
}
