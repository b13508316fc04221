#[cfg(feature = "ffmpeg-sidecar")]
mod ffmpeg;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "ffmpeg-sidecar")]
pub use ffmpeg::FfmpegAudioDecoder;

/// Mono float samples in [-1.0, 1.0].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct MonoPcm {
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

impl MonoPcm {
    pub fn duration(&self) -> Duration {
        duration_from_samples(self.sample_rate, self.samples.len())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("audio file unreadable: {0}")]
    Io(String),

    #[error("invalid pcm: {0}")]
    InvalidPcm(String),

    #[error("unsupported audio format: {0}")]
    Unsupported(String),

    #[error("ffmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    #[error("ffmpeg failed: {0}")]
    FfmpegFailed(String),
}

pub type Result<T> = std::result::Result<T, DecodeError>;

pub trait AudioDecoder: Send + Sync {
    /// Reads `path` as mono PCM resampled to `target_rate`.
    fn decode_file(&self, path: PathBuf, target_rate: u32) -> BoxFuture<'_, Result<MonoPcm>>;
}

impl<T: AudioDecoder + ?Sized> AudioDecoder for Arc<T> {
    fn decode_file(&self, path: PathBuf, target_rate: u32) -> BoxFuture<'_, Result<MonoPcm>> {
        (**self).decode_file(path, target_rate)
    }
}

/// PCM WAV reader. Integer and float encodings are accepted; channels are
/// averaged down to mono.
#[derive(Clone, Debug, Default)]
pub struct WavDecoder;

impl WavDecoder {
    pub fn new() -> Self {
        Self
    }

    fn read_mono(path: &Path) -> Result<MonoPcm> {
        let mut reader = hound::WavReader::open(path).map_err(|e| match e {
            hound::Error::IoError(io) => DecodeError::Io(format!("{}: {io}", path.display())),
            hound::Error::Unsupported => {
                DecodeError::Unsupported(format!("{} is not PCM", path.display()))
            }
            other => DecodeError::InvalidPcm(other.to_string()),
        })?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(DecodeError::InvalidPcm(format!(
                "channels={} sample_rate={}",
                spec.channels, spec.sample_rate
            )));
        }

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| DecodeError::InvalidPcm(e.to_string()))?,
            hound::SampleFormat::Int => {
                let scale = 1.0f32 / (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<std::result::Result<_, _>>()
                    .map_err(|e| DecodeError::InvalidPcm(e.to_string()))?
            }
        };

        Ok(MonoPcm {
            sample_rate: spec.sample_rate,
            samples: downmix(&interleaved, spec.channels),
        })
    }
}

impl AudioDecoder for WavDecoder {
    fn decode_file(&self, path: PathBuf, target_rate: u32) -> BoxFuture<'_, Result<MonoPcm>> {
        async move {
            let pcm = tokio::task::spawn_blocking(move || Self::read_mono(&path))
                .await
                .map_err(|e| DecodeError::Io(e.to_string()))??;
            Ok(resample_linear(&pcm, target_rate))
        }
        .boxed()
    }
}

pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Linear interpolation resampler; good enough for feature extraction.
pub fn resample_linear(pcm: &MonoPcm, target_rate: u32) -> MonoPcm {
    if pcm.sample_rate == target_rate || pcm.samples.is_empty() || target_rate == 0 {
        return MonoPcm {
            sample_rate: if target_rate == 0 { pcm.sample_rate } else { target_rate },
            samples: pcm.samples.clone(),
        };
    }

    let ratio = f64::from(pcm.sample_rate) / f64::from(target_rate);
    let out_len = ((pcm.samples.len() as f64) / ratio).floor() as usize;
    let last = pcm.samples.len() - 1;
    let samples = (0..out_len)
        .map(|i| {
            let pos = i as f64 * ratio;
            let idx = (pos.floor() as usize).min(last);
            let next = (idx + 1).min(last);
            let frac = (pos - idx as f64) as f32;
            pcm.samples[idx] * (1.0 - frac) + pcm.samples[next] * frac
        })
        .collect();

    MonoPcm {
        sample_rate: target_rate,
        samples,
    }
}

pub fn duration_from_samples(sample_rate_hz: u32, samples: usize) -> Duration {
    if sample_rate_hz == 0 {
        return Duration::from_secs(0);
    }
    let micros = (u128::from(samples as u64) * 1_000_000u128) / u128::from(sample_rate_hz);
    Duration::from_micros(micros.min(u128::from(u64::MAX)) as u64)
}
