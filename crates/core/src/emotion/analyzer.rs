use crate::decode::{AudioDecoder, DecodeError, MonoPcm};
use crate::emotion::{AudioEmotion, EmotionLabel, ProsodyFeatures, ProsodyWindow, TextEmotion};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Sample rate the audio classifier analyses at.
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;
/// Only the first window of the recording is classified.
pub const ANALYSIS_WINDOW: Duration = Duration::from_secs(3);

#[derive(thiserror::Error, Debug)]
pub enum EmotionError {
    #[error("invalid classifier input: {0}")]
    InvalidInput(String),
    #[error("emotion inference failed: {0}")]
    Inference(String),
}

impl From<DecodeError> for EmotionError {
    fn from(value: DecodeError) -> Self {
        match value {
            DecodeError::FfmpegUnavailable(_) | DecodeError::FfmpegFailed(_) => {
                EmotionError::Inference(value.to_string())
            }
            other => EmotionError::InvalidInput(other.to_string()),
        }
    }
}

pub trait EmotionClassifier: Send + Sync {
    fn classify_text(&self, text: String) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>>;

    fn classify_audio(&self, path: PathBuf) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>>;
}

impl<T: EmotionClassifier + ?Sized> EmotionClassifier for Arc<T> {
    fn classify_text(&self, text: String) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        (**self).classify_text(text)
    }

    fn classify_audio(&self, path: PathBuf) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        (**self).classify_audio(path)
    }
}

/// Keyword scan over the text label set. Audio input is rejected.
#[derive(Clone, Debug)]
pub struct KeywordTextClassifier {
    default_label: EmotionLabel,
}

impl KeywordTextClassifier {
    pub fn new(default_label: EmotionLabel) -> Self {
        Self { default_label }
    }

    pub fn detect(text: &str) -> Option<TextEmotion> {
        let lower_text = text.to_lowercase();
        let has = |words: &[&str]| {
            lower_text
                .split(|c: char| !c.is_alphanumeric() && c != '\'')
                .any(|w| words.contains(&w))
        };

        if has(&["love", "adore", "darling", "sweetheart", "cherish"]) {
            Some(TextEmotion::Love)
        } else if has(&["angry", "mad", "furious", "hate", "annoyed", "rage"]) {
            Some(TextEmotion::Anger)
        } else if has(&["scared", "afraid", "fear", "terrified", "nervous", "worried"]) {
            Some(TextEmotion::Fear)
        } else if has(&[
            "sad", "lost", "depressed", "unhappy", "miss", "cry", "lonely", "terrible",
        ]) {
            Some(TextEmotion::Sad)
        } else if has(&["wow", "surprise", "surprised", "unexpected", "whoa"]) {
            Some(TextEmotion::Surprise)
        } else if has(&["happy", "joy", "excited", "glad", "great", "amazing", "yay"]) {
            Some(TextEmotion::Joy)
        } else {
            None
        }
    }
}

impl Default for KeywordTextClassifier {
    fn default() -> Self {
        Self::new(EmotionLabel::Neutral)
    }
}

impl EmotionClassifier for KeywordTextClassifier {
    fn classify_text(&self, text: String) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        async move {
            if text.trim().is_empty() {
                return Err(EmotionError::InvalidInput("text is empty".to_owned()));
            }
            Ok(Self::detect(&text)
                .map(EmotionLabel::from)
                .unwrap_or(self.default_label))
        }
        .boxed()
    }

    fn classify_audio(&self, path: PathBuf) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        async move {
            Err(EmotionError::InvalidInput(format!(
                "keyword classifier cannot analyse audio ({})",
                path.display()
            )))
        }
        .boxed()
    }
}

/// Energy/pitch heuristic over the audio label set. Text is handed to the
/// keyword scan.
#[derive(Clone)]
pub struct ProsodyAudioClassifier<D> {
    decoder: D,
    text: KeywordTextClassifier,
}

impl<D> ProsodyAudioClassifier<D>
where
    D: AudioDecoder,
{
    pub fn new(decoder: D, default_label: EmotionLabel) -> Self {
        Self {
            decoder,
            text: KeywordTextClassifier::new(default_label),
        }
    }

    pub fn window(pcm: &MonoPcm) -> ProsodyWindow {
        let max_samples = (u128::from(pcm.sample_rate) * ANALYSIS_WINDOW.as_millis() / 1000) as usize;
        let samples = &pcm.samples[..pcm.samples.len().min(max_samples)];
        ProsodyWindow {
            duration: crate::decode::duration_from_samples(pcm.sample_rate, samples.len()),
            features: extract_features(samples, pcm.sample_rate),
        }
    }

    pub fn map_prosody(features: &ProsodyFeatures) -> AudioEmotion {
        if features.energy_rms < 0.02 {
            return AudioEmotion::Neutral;
        }
        match features.pitch_hz {
            Some(pitch) if features.energy_rms > 0.3 && pitch > 250.0 => AudioEmotion::Surprise,
            _ if features.energy_rms > 0.3 => AudioEmotion::Angry,
            Some(pitch) if pitch > 180.0 => AudioEmotion::Happy,
            Some(pitch) if pitch < 120.0 => AudioEmotion::Sad,
            _ => AudioEmotion::Neutral,
        }
    }
}

impl<D> EmotionClassifier for ProsodyAudioClassifier<D>
where
    D: AudioDecoder,
{
    fn classify_text(&self, text: String) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        self.text.classify_text(text)
    }

    fn classify_audio(&self, path: PathBuf) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        async move {
            let pcm = self.decoder.decode_file(path, ANALYSIS_SAMPLE_RATE).await?;
            if pcm.samples.is_empty() {
                return Err(EmotionError::InvalidInput("waveform is empty".to_owned()));
            }
            let window = Self::window(&pcm);
            let emotion = Self::map_prosody(&window.features);
            tracing::debug!(
                energy = window.features.energy_rms,
                pitch = ?window.features.pitch_hz,
                ?emotion,
                "audio emotion classified"
            );
            Ok(emotion.into())
        }
        .boxed()
    }
}

fn extract_features(samples: &[f32], sample_rate: u32) -> ProsodyFeatures {
    if samples.is_empty() || sample_rate == 0 {
        return ProsodyFeatures {
            energy_rms: 0.0,
            pitch_hz: None,
        };
    }

    let energy = samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32;
    let energy_rms = energy.sqrt();

    // Zero-crossing rate approximates the fundamental for voiced speech.
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    let seconds = samples.len() as f32 / sample_rate as f32;
    let pitch_hz = if crossings > 0 && seconds > 0.0 {
        Some(crossings as f32 / (2.0 * seconds))
    } else {
        None
    };

    ProsodyFeatures {
        energy_rms,
        pitch_hz,
    }
}
