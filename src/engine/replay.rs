use super::backend::{RecognitionEngine, RecognitionRequest};
use super::events::{EngineSink, RecognitionEvent};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// One scripted event and the delay before it fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayStep {
    /// Delay after the previous step, in milliseconds
    #[serde(default)]
    pub delay_ms: u64,
    pub event: RecognitionEvent,
}

/// Timed sequence of recognition events
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplayScript {
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event fired `delay_ms` after the previous one
    pub fn then(mut self, delay_ms: u64, event: RecognitionEvent) -> Self {
        self.steps.push(ReplayStep { delay_ms, event });
        self
    }
}

/// Engine that plays back a recorded or hand-written event script
///
/// Audio and reference text are ignored; the script decides what is recognized.
pub struct ReplayEngine {
    script: ReplayScript,
    task: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl ReplayEngine {
    pub fn new(script: ReplayScript) -> Self {
        Self {
            script,
            task: Mutex::new(None),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read replay script: {}", path.display()))?;
        let script: ReplayScript =
            serde_json::from_slice(&data).context("Failed to parse replay script")?;

        info!(
            "Loaded replay script: {} ({} steps)",
            path.display(),
            script.steps.len()
        );

        Ok(Self::new(script))
    }
}

#[async_trait::async_trait]
impl RecognitionEngine for ReplayEngine {
    async fn start(&self, request: RecognitionRequest, sink: EngineSink) -> Result<()> {
        debug!(
            "Replaying {} steps for clip {} (reference: {:?})",
            self.script.steps.len(),
            request.audio.id,
            request.reference_text
        );

        let steps = self.script.steps.clone();
        let handle = tokio::spawn(async move {
            for step in steps {
                if step.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(step.delay_ms)).await;
                }
                if !sink.emit(step.event) {
                    break;
                }
            }
        });

        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if self.stopped.load(Ordering::SeqCst) {
            // Stopped while starting
            handle.abort();
        } else {
            *task = Some(handle);
        }

        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = task.take() {
            handle.abort();
            debug!("Replay task aborted");
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}
