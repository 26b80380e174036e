use anyhow::{Context, Result};
use hound::WavReader;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Decoded mono audio handed to a recognition engine
///
/// Samples are shared, so cloning a clip is cheap.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Identifier carried into the persisted report
    pub id: String,
    /// Sample rate in Hz
    pub sample_rate: u32,
    samples: Arc<[i16]>,
}

impl AudioClip {
    /// Rate the recognition engines expect
    pub const SAMPLE_RATE: u32 = 16000;

    pub fn new(id: impl Into<String>, samples: Vec<i16>) -> Self {
        Self {
            id: id.into(),
            sample_rate: Self::SAMPLE_RATE,
            samples: samples.into(),
        }
    }

    /// Load a 16kHz mono 16-bit WAV file
    ///
    /// Other formats are rejected; normalize with an external converter first.
    pub fn from_wav(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        if spec.sample_rate != Self::SAMPLE_RATE || spec.channels != 1 {
            anyhow::bail!(
                "Expected {}Hz mono, got {}Hz {}ch",
                Self::SAMPLE_RATE,
                spec.sample_rate,
                spec.channels
            );
        }

        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let clip = Self::new(id, samples);
        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} samples",
            clip.duration_seconds(),
            clip.sample_rate,
            clip.samples.len()
        );

        Ok(clip)
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Consecutive windows of at most `max_secs` seconds each
    pub fn windows(&self, max_secs: u32) -> impl Iterator<Item = &[i16]> {
        let window_len = (self.sample_rate as usize * max_secs.max(1) as usize).max(1);
        self.samples.chunks(window_len)
    }
}

/// Encode mono 16-bit samples as an in-memory WAV file
pub fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = Vec::with_capacity(44 + samples.len() * 2);
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buffer), spec)
            .context("Failed to create WAV writer")?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .context("Failed to write sample to WAV")?;
        }
        writer.finalize().context("Failed to finalize WAV data")?;
    }

    Ok(buffer)
}
