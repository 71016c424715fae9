use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::{StageError, StageResult};

/// Scale of analyzer readings; a full-scale RMS maps to this level.
pub const LEVEL_MAX: f32 = 255.0;

/// Decoded mono PCM clip.
#[derive(Clone, Debug)]
pub struct AudioClip {
    /// Samples per second.
    pub sample_rate: u32,
    /// Mono samples in `[-1, 1]`.
    pub samples: Arc<[f32]>,
}

impl AudioClip {
    /// Wrap already-decoded mono samples.
    pub fn from_samples(sample_rate: u32, samples: Vec<f32>) -> StageResult<Self> {
        if sample_rate == 0 {
            return Err(StageError::audio("sample rate must be > 0"));
        }
        Ok(Self {
            sample_rate,
            samples: samples.into(),
        })
    }

    /// Decode a WAV file, downmixing every channel to mono.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn decode_wav(path: &Path) -> StageResult<Self> {
        let reader = hound::WavReader::open(path).map_err(|e| {
            StageError::audio(format!("failed to open '{}': {e}", path.display()))
        })?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(StageError::audio(format!(
                "'{}' declares zero channels",
                path.display()
            )));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<Vec<f32>, _>>()
            }
            hound::SampleFormat::Float => reader.into_samples::<f32>().collect::<Result<Vec<f32>, _>>(),
        }
        .map_err(|e| StageError::audio(format!("failed to decode '{}': {e}", path.display())))?;

        let channels = usize::from(spec.channels);
        let mono = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        tracing::debug!(sample_rate = spec.sample_rate, channels, "decoded wav");
        Self::from_samples(spec.sample_rate, mono)
    }

    /// Clip length in seconds.
    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    /// RMS loudness of the `window` seconds ending at `at`, on the `0..=LEVEL_MAX` scale.
    pub fn level_at(&self, at: f32, window: f32) -> f32 {
        let rate = self.sample_rate as f32;
        let end = ((at.max(0.0) * rate) as usize).min(self.samples.len());
        let len = ((window.max(0.0) * rate) as usize).max(1);
        let start = end.saturating_sub(len);
        let slice = &self.samples[start..end];
        if slice.is_empty() {
            return 0.0;
        }
        let mean_sq = slice.iter().map(|s| s * s).sum::<f32>() / slice.len() as f32;
        (mean_sq.sqrt() * LEVEL_MAX).min(LEVEL_MAX)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/audio/clip.rs"]
mod tests;
