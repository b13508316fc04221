mod handoff;
mod recorder;
mod transcriber;

use crate::config::RecordDuration;
use crate::emotion::{DefaultingClassifier, EmotionClassifier, EmotionLabel};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;

pub use handoff::EmotionHandoff;
pub use recorder::{ClipRecorder, RecordedClip, CAPTURE_SAMPLE_RATE};
pub use transcriber::CommandTranscriber;

const LOG_TARGET: &str = "capture";

#[derive(thiserror::Error, Debug)]
pub enum CaptureError {
    #[error("invalid capture input: {0}")]
    InvalidInput(String),

    #[error("recording failed: {0}")]
    Recording(String),

    #[error("transcription service failed: {0}")]
    Transcription(String),

    #[error("speech was not understood, please try again")]
    SpeechNotUnderstood,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordRequest {
    /// Pre-recorded audio to take the clip from; `None` for live devices.
    pub source: Option<PathBuf>,
    pub dest: PathBuf,
    pub duration: RecordDuration,
}

/// Produces a WAV clip of at most `duration`, publishing completion
/// percentage on `progress` as it goes.
pub trait Recorder: Send + Sync {
    fn record(
        &self,
        request: RecordRequest,
        progress: watch::Sender<u8>,
    ) -> BoxFuture<'_, Result<RecordedClip, CaptureError>>;
}

pub trait Transcriber: Send + Sync {
    fn transcribe(&self, audio: PathBuf) -> BoxFuture<'_, Result<String, CaptureError>>;
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapturedInput {
    pub audio_path: PathBuf,
    pub transcript: String,
    pub emotion: EmotionLabel,
}

/// Record, transcribe, then classify the recording's emotion.
pub struct AudioCapture<R, T, C> {
    recorder: R,
    transcriber: T,
    classifier: DefaultingClassifier<C>,
    audio_in_dir: PathBuf,
    duration: RecordDuration,
    next_clip: AtomicU64,
}

impl<R, T, C> AudioCapture<R, T, C>
where
    R: Recorder,
    T: Transcriber,
    C: EmotionClassifier,
{
    pub fn new(
        recorder: R,
        transcriber: T,
        classifier: DefaultingClassifier<C>,
        audio_in_dir: PathBuf,
        duration: RecordDuration,
    ) -> Self {
        Self {
            recorder,
            transcriber,
            classifier,
            audio_in_dir,
            duration,
            next_clip: AtomicU64::new(0),
        }
    }

    pub fn audio_in_dir(&self) -> &Path {
        &self.audio_in_dir
    }

    /// `on_progress` runs alongside the recording and sees every published
    /// percentage until the recorder finishes.
    pub async fn capture<F>(
        &self,
        source: Option<PathBuf>,
        on_progress: F,
    ) -> Result<CapturedInput, CaptureError>
    where
        F: FnMut(u8) + Send,
    {
        let clip = self.next_clip.fetch_add(1, Ordering::Relaxed);
        let request = RecordRequest {
            source,
            dest: self.audio_in_dir.join(format!("input_{clip}.wav")),
            duration: self.duration,
        };
        let (tx, rx) = watch::channel(0u8);

        let (recorded, ()) = tokio::join!(
            self.recorder.record(request, tx),
            follow_progress(rx, on_progress)
        );
        let recorded = recorded?;
        tracing::info!(
            target: LOG_TARGET,
            path = %recorded.path.display(),
            duration_ms = recorded.duration.as_millis() as u64,
            "recording finished"
        );

        let transcript = self.transcriber.transcribe(recorded.path.clone()).await?;
        let transcript = transcript.trim().to_owned();
        if transcript.is_empty() {
            return Err(CaptureError::SpeechNotUnderstood);
        }

        let emotion = self.classifier.audio_or_default(recorded.path.clone()).await;
        tracing::info!(target: LOG_TARGET, %emotion, "speech captured");

        Ok(CapturedInput {
            audio_path: recorded.path,
            transcript,
            emotion,
        })
    }
}

async fn follow_progress<F>(mut rx: watch::Receiver<u8>, mut on_progress: F)
where
    F: FnMut(u8),
{
    let first = *rx.borrow_and_update();
    on_progress(first);
    while rx.changed().await.is_ok() {
        let pct = *rx.borrow_and_update();
        on_progress(pct);
    }
}
