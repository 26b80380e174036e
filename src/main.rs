use anyhow::{Context, Result};
use clap::Parser;
use pronunciation_assess::{
    assess, AssessmentSource, AudioClip, Config, EngineKind, JsonLinesSink, ReportRecord,
    ReportSink, SpeechType,
};
use std::path::PathBuf;
use tracing::{error, info};

/// Score a recording against the text the speaker was asked to read
#[derive(Debug, Parser)]
#[command(name = "pronunciation-assess", version)]
struct Args {
    /// 16kHz mono WAV recording
    #[arg(long, required_unless_present = "replay")]
    audio: Option<PathBuf>,

    /// Reference text the speaker read
    #[arg(long)]
    reference: String,

    /// Config file (without extension)
    #[arg(long, default_value = "config/pronunciation-assess")]
    config: String,

    /// Replay a recorded event script instead of calling the speech service
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Identifier stored with the report (defaults to the file name)
    #[arg(long)]
    audio_id: Option<String>,

    #[arg(long, value_enum, default_value = "flashcard")]
    source: AssessmentSource,

    #[arg(long, value_enum, default_value = "formal")]
    speech_type: SpeechType,

    /// Override the session timeout
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Append the report to this JSON-lines file
    #[arg(long)]
    out: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));

    if let Some(script) = &args.replay {
        cfg.engine.kind = EngineKind::Replay;
        cfg.engine.replay_script = Some(script.clone());
    }
    if let Some(secs) = args.timeout_secs {
        cfg.assessment.timeout_secs = secs;
    }

    let mut audio = match &args.audio {
        Some(path) => AudioClip::from_wav(path)?,
        None => AudioClip::new("replay", Vec::new()),
    };
    if let Some(id) = &args.audio_id {
        audio.id = id.clone();
    }
    let audio_id = audio.id.clone();

    let report = match assess(
        &cfg.engine,
        audio,
        &args.reference,
        cfg.assessment.to_assess_config(),
    )
    .await
    {
        Ok(report) => report,
        Err(e) => {
            error!("Assessment failed ({:?}): {}", e.kind(), e);
            return Err(e).context("Assessment failed");
        }
    };

    let record = ReportRecord::new(audio_id, args.source, args.speech_type, report);
    println!("{}", serde_json::to_string_pretty(&record)?);

    if let Some(path) = args.out.or(cfg.report.path) {
        JsonLinesSink::new(path).persist(&record).await?;
    }

    Ok(())
}
