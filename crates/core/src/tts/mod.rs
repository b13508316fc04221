mod basic;
mod command;

use crate::emotion::{style_for, EmotionLabel};
use crate::wav::{self, WavError};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use basic::ToneTtsBackend;
pub use command::CommandTtsBackend;

const LOG_TARGET: &str = "tts";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TtsRequest {
    pub text: String,
    pub style_description: String,
}

/// Raw model output before normalisation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TtsWaveform {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioArtifact {
    pub sequence: u64,
    pub path: PathBuf,
    pub sample_rate_hz: u32,
    pub sample_count: usize,
}

impl AudioArtifact {
    pub fn duration(&self) -> Duration {
        crate::decode::duration_from_samples(self.sample_rate_hz, self.sample_count)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum SynthesisError {
    #[error("reply text is empty")]
    EmptyText,

    #[error("speech backend failed: {0}")]
    Backend(String),

    #[error("speech backend produced no samples")]
    EmptyWaveform,

    #[error("speech backend produced a silent waveform")]
    SilentWaveform,

    #[error("speech backend produced non-finite samples")]
    NonFiniteWaveform,

    #[error("failed to write audio artifact: {0}")]
    Artifact(String),
}

impl From<WavError> for SynthesisError {
    fn from(value: WavError) -> Self {
        match value {
            WavError::Empty => SynthesisError::EmptyWaveform,
            WavError::Silent => SynthesisError::SilentWaveform,
            WavError::NonFinite => SynthesisError::NonFiniteWaveform,
            WavError::Io(e) => SynthesisError::Artifact(e),
        }
    }
}

/// A conditioned text-to-speech model.
pub trait TtsBackend: Send + Sync {
    fn generate(&self, request: TtsRequest) -> BoxFuture<'_, Result<TtsWaveform, SynthesisError>>;
}

impl<T: TtsBackend + ?Sized> TtsBackend for Arc<T> {
    fn generate(&self, request: TtsRequest) -> BoxFuture<'_, Result<TtsWaveform, SynthesisError>> {
        (**self).generate(request)
    }
}

pub trait SpeechSynthesizer: Send + Sync {
    fn synthesize(
        &self,
        text: String,
        emotion: EmotionLabel,
        sequence: u64,
    ) -> BoxFuture<'_, Result<AudioArtifact, SynthesisError>>;
}

impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    fn synthesize(
        &self,
        text: String,
        emotion: EmotionLabel,
        sequence: u64,
    ) -> BoxFuture<'_, Result<AudioArtifact, SynthesisError>> {
        (**self).synthesize(text, emotion, sequence)
    }
}

pub fn audio_artifact_path(output_dir: &Path, sequence: u64) -> PathBuf {
    output_dir.join(format!("turn_{sequence}.wav"))
}

/// Resolves the emotion's style, runs the backend and stores the result
/// as `turn_<n>.wav` under `output_dir`.
#[derive(Clone)]
pub struct StyledSpeechSynthesizer<B> {
    backend: B,
    output_dir: PathBuf,
}

impl<B> StyledSpeechSynthesizer<B>
where
    B: TtsBackend,
{
    pub fn new(backend: B, output_dir: PathBuf) -> Self {
        Self {
            backend,
            output_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

impl<B> SpeechSynthesizer for StyledSpeechSynthesizer<B>
where
    B: TtsBackend,
{
    fn synthesize(
        &self,
        text: String,
        emotion: EmotionLabel,
        sequence: u64,
    ) -> BoxFuture<'_, Result<AudioArtifact, SynthesisError>> {
        async move {
            if text.trim().is_empty() {
                return Err(SynthesisError::EmptyText);
            }
            let style = style_for(emotion);
            tracing::debug!(target: LOG_TARGET, turn = sequence, %emotion, style = style.description, "synthesizing");

            let waveform = self
                .backend
                .generate(TtsRequest {
                    text,
                    style_description: style.description.to_owned(),
                })
                .await?;
            if waveform.sample_rate_hz == 0 {
                return Err(SynthesisError::Backend("backend reported a 0 Hz sample rate".into()));
            }

            let pcm = wav::normalize_to_pcm16(&waveform.samples)?;
            let path = audio_artifact_path(&self.output_dir, sequence);
            let sample_rate = waveform.sample_rate_hz;
            let write_path = path.clone();
            let info = tokio::task::spawn_blocking(move || {
                wav::write_pcm16_mono(&write_path, sample_rate, &pcm)
            })
            .await
            .map_err(|e| SynthesisError::Artifact(e.to_string()))??;

            tracing::info!(
                target: LOG_TARGET,
                turn = sequence,
                path = %path.display(),
                samples = info.sample_count,
                sample_rate = info.sample_rate,
                "audio artifact written"
            );

            Ok(AudioArtifact {
                sequence,
                path,
                sample_rate_hz: info.sample_rate,
                sample_count: info.sample_count,
            })
        }
        .boxed()
    }
}
