//! Azure Speech pronunciation assessment over the short-audio REST API
//!
//! The REST endpoint scores at most about a minute of audio per request, so
//! the clip is uploaded in consecutive windows and every window that
//! recognizes speech becomes one segment.

use super::backend::{RecognitionEngine, RecognitionRequest};
use super::events::{CancellationReason, EngineSink};
use crate::assessment::{SegmentResult, WordErrorKind, WordResult};
use crate::audio::{encode_wav, AudioClip};
use crate::config::EngineConfig;
use anyhow::{Context, Result};
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Value of the `Pronunciation-Assessment` request header (before base64)
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AssessmentParams<'a> {
    reference_text: &'a str,
    grading_system: &'static str,
    granularity: &'static str,
    dimension: &'static str,
    enable_miscue: bool,
    enable_prosody_assessment: bool,
}

/// Detailed-format recognition response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct RecognitionResponse {
    recognition_status: String,
    #[serde(default)]
    display_text: String,
    #[serde(default, rename = "NBest")]
    n_best: Vec<NBestEntry>,
}

/// Scores are either flat on the entry or nested under `PronunciationAssessment`
/// depending on API version.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Scores {
    accuracy_score: Option<f64>,
    fluency_score: Option<f64>,
    prosody_score: Option<f64>,
    pron_score: Option<f64>,
    error_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NBestEntry {
    #[serde(default)]
    display: String,
    #[serde(flatten)]
    flat: Scores,
    pronunciation_assessment: Option<Scores>,
    #[serde(default)]
    words: Vec<NBestWord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct NBestWord {
    word: String,
    #[serde(flatten)]
    flat: Scores,
    pronunciation_assessment: Option<Scores>,
}

fn pick(nested: &Option<Scores>, flat: &Scores, get: impl Fn(&Scores) -> Option<f64>) -> f64 {
    nested
        .as_ref()
        .and_then(&get)
        .or_else(|| get(flat))
        .unwrap_or(0.0)
}

/// Outcome of one uploaded window
#[derive(Debug, PartialEq)]
pub(crate) enum WindowOutcome {
    Segment(SegmentResult),
    /// Silence or unintelligible audio
    NoMatch,
    Failed(CancellationReason),
}

impl RecognitionResponse {
    pub(crate) fn into_outcome(self) -> WindowOutcome {
        match self.recognition_status.as_str() {
            "Success" => {}
            "NoMatch" | "InitialSilenceTimeout" | "BabbleTimeout" => return WindowOutcome::NoMatch,
            other => {
                return WindowOutcome::Failed(CancellationReason::Error {
                    code: other.to_string(),
                    details: "recognition failed".to_string(),
                })
            }
        }

        let Some(best) = self.n_best.into_iter().next() else {
            return WindowOutcome::Segment(SegmentResult {
                recognized_text: self.display_text,
                words: Vec::new(),
                pronunciation_score: 0.0,
                accuracy_score: 0.0,
                fluency_score: 0.0,
                prosody_score: 0.0,
            });
        };

        let words = best
            .words
            .iter()
            .map(|w| {
                let label = w
                    .pronunciation_assessment
                    .as_ref()
                    .and_then(|s| s.error_type.clone())
                    .or_else(|| w.flat.error_type.clone())
                    .unwrap_or_default();
                WordResult {
                    text: w.word.clone(),
                    accuracy_score: pick(&w.pronunciation_assessment, &w.flat, |s| s.accuracy_score),
                    error_kind: WordErrorKind::from_label(&label),
                }
            })
            .collect();

        let recognized_text = if self.display_text.is_empty() {
            best.display.clone()
        } else {
            self.display_text
        };

        WindowOutcome::Segment(SegmentResult {
            recognized_text,
            words,
            pronunciation_score: pick(&best.pronunciation_assessment, &best.flat, |s| s.pron_score),
            accuracy_score: pick(&best.pronunciation_assessment, &best.flat, |s| s.accuracy_score),
            fluency_score: pick(&best.pronunciation_assessment, &best.flat, |s| s.fluency_score),
            prosody_score: pick(&best.pronunciation_assessment, &best.flat, |s| s.prosody_score),
        })
    }
}

/// Pronunciation assessment through the Azure Speech REST API
pub struct AzureEngine {
    client: reqwest::Client,
    endpoint: String,
    key: String,
    window_secs: u32,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AzureEngine {
    pub fn new(config: &EngineConfig, key: String) -> Result<Self> {
        let endpoint = match &config.endpoint {
            Some(endpoint) => endpoint.clone(),
            None => format!(
                "https://{}.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1?language={}&format=detailed",
                config.region, config.language
            ),
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint,
            key,
            window_secs: config.window_secs.max(1),
            task: Mutex::new(None),
        })
    }

    fn assessment_header(reference_text: &str, enable_miscue: bool) -> Result<String> {
        let params = AssessmentParams {
            reference_text,
            grading_system: "HundredMark",
            granularity: "Phoneme",
            dimension: "Comprehensive",
            enable_miscue,
            enable_prosody_assessment: true,
        };
        let json = serde_json::to_vec(&params)?;
        Ok(base64::engine::general_purpose::STANDARD.encode(json))
    }

    async fn post_window(
        client: &reqwest::Client,
        endpoint: &str,
        key: &str,
        header: &str,
        wav: Vec<u8>,
        sample_rate: u32,
    ) -> WindowOutcome {
        let response = client
            .post(endpoint)
            .header("Ocp-Apim-Subscription-Key", key)
            .header(
                "Content-Type",
                format!("audio/wav; codecs=audio/pcm; samplerate={}", sample_rate),
            )
            .header("Accept", "application/json")
            .header("Pronunciation-Assessment", header)
            .body(wav)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                return WindowOutcome::Failed(CancellationReason::Error {
                    code: "ConnectionFailure".to_string(),
                    details: e.to_string(),
                })
            }
        };

        let status = response.status();
        if !status.is_success() {
            let details = response.text().await.unwrap_or_default();
            return WindowOutcome::Failed(CancellationReason::Error {
                code: status.as_u16().to_string(),
                details,
            });
        }

        match response.json::<RecognitionResponse>().await {
            Ok(body) => body.into_outcome(),
            Err(e) => WindowOutcome::Failed(CancellationReason::Error {
                code: "InvalidResponse".to_string(),
                details: e.to_string(),
            }),
        }
    }

    async fn run(
        client: reqwest::Client,
        endpoint: String,
        key: String,
        window_secs: u32,
        audio: AudioClip,
        reference_text: String,
        sink: EngineSink,
    ) {
        let windows: Vec<&[i16]> = audio.windows(window_secs).collect();
        // Miscue detection compares against the whole reference text, which
        // only lines up when the clip fits in one window.
        let enable_miscue = windows.len() <= 1;

        let header = match Self::assessment_header(&reference_text, enable_miscue) {
            Ok(h) => h,
            Err(e) => {
                sink.canceled(CancellationReason::Error {
                    code: "InvalidRequest".to_string(),
                    details: e.to_string(),
                });
                return;
            }
        };

        info!(
            "Assessing clip {} in {} window(s) of up to {}s",
            audio.id,
            windows.len(),
            window_secs
        );

        for (index, window) in windows.iter().enumerate() {
            if sink.is_stopped() {
                return;
            }

            let wav = match encode_wav(window, audio.sample_rate) {
                Ok(w) => w,
                Err(e) => {
                    sink.canceled(CancellationReason::Error {
                        code: "AudioEncoding".to_string(),
                        details: format!("{:#}", e),
                    });
                    return;
                }
            };

            match Self::post_window(&client, &endpoint, &key, &header, wav, audio.sample_rate).await {
                WindowOutcome::Segment(segment) => {
                    debug!(
                        "Window {} recognized: {:?} ({} words)",
                        index,
                        segment.recognized_text,
                        segment.word_count()
                    );
                    sink.recognized(segment);
                }
                WindowOutcome::NoMatch => {
                    debug!("Window {} contained no recognizable speech", index);
                }
                WindowOutcome::Failed(reason) => {
                    error!("Window {} failed: {}", index, reason);
                    sink.canceled(reason);
                    return;
                }
            }
        }

        sink.session_stopped();
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for AzureEngine {
    async fn start(&self, request: RecognitionRequest, sink: EngineSink) -> Result<()> {
        if request.audio.sample_rate != AudioClip::SAMPLE_RATE {
            anyhow::bail!(
                "Expected {}Hz audio, got {}Hz",
                AudioClip::SAMPLE_RATE,
                request.audio.sample_rate
            );
        }

        let handle = tokio::spawn(Self::run(
            self.client.clone(),
            self.endpoint.clone(),
            self.key.clone(),
            self.window_secs,
            request.audio,
            request.reference_text,
            sink,
        ));

        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(previous) = task.replace(handle) {
            warn!("Azure engine restarted while a session was running");
            previous.abort();
        }

        Ok(())
    }

    fn stop(&self) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
            debug!("Azure recognition task aborted");
        }
    }

    fn name(&self) -> &str {
        "azure"
    }
}
