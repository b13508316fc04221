//! PCM16 WAV artifacts.
//!
//! Synthesised speech is peak-normalised into the full signed 16-bit range
//! before it is written, so a waveform with no energy cannot be stored.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(thiserror::Error, Debug)]
pub enum WavError {
    #[error("waveform is empty")]
    Empty,

    #[error("waveform is silent (peak amplitude is zero)")]
    Silent,

    #[error("waveform contains non-finite samples")]
    NonFinite,

    #[error("wav io failed: {0}")]
    Io(String),
}

impl From<hound::Error> for WavError {
    fn from(value: hound::Error) -> Self {
        WavError::Io(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WavInfo {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_count: usize,
}

/// Scales `samples` so the loudest one lands on ±32767.
pub fn normalize_to_pcm16(samples: &[f32]) -> Result<Vec<i16>, WavError> {
    if samples.is_empty() {
        return Err(WavError::Empty);
    }
    if samples.iter().any(|s| !s.is_finite()) {
        return Err(WavError::NonFinite);
    }
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= f32::EPSILON {
        return Err(WavError::Silent);
    }

    let scale = f32::from(i16::MAX) / peak;
    Ok(samples
        .iter()
        .map(|s| (s * scale).round().clamp(-f32::from(i16::MAX), f32::from(i16::MAX)) as i16)
        .collect())
}

pub fn write_pcm16_mono(path: &Path, sample_rate: u32, samples: &[i16]) -> Result<WavInfo, WavError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| WavError::Io(e.to_string()))?;
    }
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)?;
    for s in samples {
        writer.write_sample(*s)?;
    }
    writer.finalize()?;

    Ok(WavInfo {
        sample_rate,
        channels: 1,
        sample_count: samples.len(),
    })
}

pub fn read_info(path: &Path) -> Result<WavInfo, WavError> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    Ok(WavInfo {
        sample_rate: spec.sample_rate,
        channels: spec.channels,
        sample_count: reader.len() as usize,
    })
}

pub fn read_pcm16(path: &Path) -> Result<(WavInfo, Vec<i16>), WavError> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let samples = reader
        .samples::<i16>()
        .collect::<Result<Vec<_>, _>>()?;
    Ok((
        WavInfo {
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            sample_count: samples.len(),
        },
        samples,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_waveform_is_rejected() {
        assert!(matches!(normalize_to_pcm16(&[0.0; 128]), Err(WavError::Silent)));
        assert!(matches!(normalize_to_pcm16(&[]), Err(WavError::Empty)));
        assert!(matches!(
            normalize_to_pcm16(&[0.1, f32::NAN]),
            Err(WavError::NonFinite)
        ));
    }

    #[test]
    fn normalisation_reaches_full_scale() {
        let out = normalize_to_pcm16(&[0.1, -0.2, 0.05]).unwrap();
        assert_eq!(out[1], -32767);
        assert!((i32::from(out[0]) - 16384).abs() <= 1);
        assert!(out.iter().all(|s| *s != i16::MIN));
    }

    #[test]
    fn written_artifact_keeps_sample_count_and_rate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("turn_0.wav");
        let samples = normalize_to_pcm16(&[0.3, -0.6, 0.9, 0.0, -0.1]).unwrap();

        let written = write_pcm16_mono(&path, 44_100, &samples).unwrap();
        let (info, read_back) = read_pcm16(&path).unwrap();

        assert_eq!(info, written);
        assert_eq!(info.sample_rate, 44_100);
        assert_eq!(info.sample_count, 5);
        assert_eq!(read_back, samples);
        assert_eq!(read_info(&path).unwrap(), written);
    }
}
