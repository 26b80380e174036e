use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for one assessment session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessConfig {
    /// Hard limit on the recognition session
    /// Default: 300 seconds (5 minutes)
    pub timeout: Duration,

    /// Words below this accuracy are reported as mispronounced
    /// Default: 60
    pub mispronunciation_threshold: f64,
}

impl Default for AssessConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(300), // 5 minutes
            mispronunciation_threshold: 60.0,
        }
    }
}
