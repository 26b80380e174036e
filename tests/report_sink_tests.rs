// Integration tests for report persistence

use anyhow::Result;
use pronunciation_assess::{
    AggregateReport, AssessmentSource, JsonLinesSink, Mispronunciation, ReportRecord, ReportSink,
    SpeechType, WordErrorKind,
};
use tempfile::TempDir;

fn report() -> AggregateReport {
    AggregateReport {
        pronunciation_score: 80.0,
        accuracy_score: 75.0,
        fluency_score: 90.0,
        prosody_score: 70.0,
        total_score: 315.0,
        recognized_text: "Good morning everyone".to_string(),
        mispronunciations: vec![Mispronunciation {
            word: "everyone".to_string(),
            accuracy_score: 42.0,
            error_kind: WordErrorKind::Mispronunciation,
        }],
        partial: false,
        segment_count: 1,
        word_count: 3,
    }
}

#[tokio::test]
async fn test_record_shape() -> Result<()> {
    let record = ReportRecord::new("42", AssessmentSource::Shadowing, SpeechType::Shadowing, report());
    let value = serde_json::to_value(&record)?;

    assert_eq!(value["audio_id"], "42");
    assert_eq!(value["source"], "shadowing");
    assert_eq!(value["speech_type"], "shadowing");
    assert_eq!(value["total_score"], 315.0);
    assert_eq!(value["recognized_text"], "Good morning everyone");
    assert_eq!(value["mispronunciations"][0]["word"], "everyone");
    assert_eq!(value["mispronunciations"][0]["error_kind"], "Mispronunciation");
    assert_eq!(value["partial"], false);
    assert!(value["prosody_issues"].as_object().unwrap().is_empty());
    assert!(value["report_md_path"].is_null());

    Ok(())
}

#[tokio::test]
async fn test_json_lines_sink_appends() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("reports").join("pronunciation.jsonl");
    let sink = JsonLinesSink::new(&path);

    let first = ReportRecord::new("word-1", AssessmentSource::Flashcard, SpeechType::Formal, report());
    let second = ReportRecord::new("word-2", AssessmentSource::Flashcard, SpeechType::Informal, report());
    sink.persist(&first).await?;
    sink.persist(&second).await?;

    let contents = std::fs::read_to_string(&path)?;
    let records: Vec<ReportRecord> = contents
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    assert_eq!(records, vec![first, second]);
    assert_eq!(records[1].speech_type, SpeechType::Informal);

    Ok(())
}
