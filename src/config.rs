use crate::assessment::AssessConfig;
use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the speech service key
pub const SPEECH_KEY_ENV: &str = "FGL_SPEECH_SERVICE_KEY";

/// Environment variable holding the speech service region
pub const SPEECH_REGION_ENV: &str = "FGL_SPEECH_REGION";

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub assessment: AssessmentSettings,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

/// Which recognition engine to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    Azure,
    Replay,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,

    /// Speech service key; falls back to `FGL_SPEECH_SERVICE_KEY`
    pub key: Option<String>,

    pub region: String,
    pub language: String,

    /// Override of the REST endpoint (region and language are then ignored)
    pub endpoint: Option<String>,

    /// Longest audio window sent in one request, in seconds
    pub window_secs: u32,

    /// Event script for the replay engine
    pub replay_script: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: EngineKind::Azure,
            key: None,
            region: std::env::var(SPEECH_REGION_ENV).unwrap_or_else(|_| "eastus".to_string()),
            language: "en-US".to_string(),
            endpoint: None,
            window_secs: 30,
            replay_script: None,
        }
    }
}

impl EngineConfig {
    /// Configured key, or the environment fallback; empty keys count as missing
    pub fn resolved_key(&self) -> Option<String> {
        resolve_key(self.key.as_deref(), std::env::var(SPEECH_KEY_ENV).ok())
    }
}

fn resolve_key(configured: Option<&str>, fallback: Option<String>) -> Option<String> {
    configured
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .or_else(|| fallback.filter(|k| !k.is_empty()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssessmentSettings {
    /// Maximum session duration in seconds
    pub timeout_secs: u64,

    /// Words scoring below this accuracy are flagged
    pub mispronunciation_threshold: f64,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        let defaults = AssessConfig::default();
        Self {
            timeout_secs: defaults.timeout.as_secs(),
            mispronunciation_threshold: defaults.mispronunciation_threshold,
        }
    }
}

impl AssessmentSettings {
    pub fn to_assess_config(&self) -> AssessConfig {
        AssessConfig {
            timeout: Duration::from_secs(self.timeout_secs),
            mispronunciation_threshold: self.mispronunciation_threshold,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// JSON-lines file reports are appended to
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load from `path` (any extension the config crate knows), then apply
    /// `ASSESS__SECTION__KEY` environment overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "pronunciation-assess")?
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("ASSESS").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
