mod lipsync;

use crate::emotion::EmotionLabel;
use crate::tts::AudioArtifact;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub use lipsync::LipSyncAnimator;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoArtifact {
    pub sequence: u64,
    pub path: PathBuf,
}

#[derive(thiserror::Error, Debug)]
pub enum AnimationError {
    #[error("animation input missing: {0}")]
    MissingInput(PathBuf),

    #[error("failed to spawn animator: {0}")]
    Spawn(String),

    #[error("animator exited with {status}: {stderr}")]
    Exited { status: String, stderr: String },

    #[error("animator produced no video at {0}")]
    MissingOutput(PathBuf),

    #[error("animator timed out after {0:?}")]
    Timeout(Duration),
}

/// Turns synthesised speech into a lip-synced talking-face video.
pub trait Animator: Send + Sync {
    fn animate(
        &self,
        audio: AudioArtifact,
        emotion: EmotionLabel,
    ) -> BoxFuture<'_, Result<VideoArtifact, AnimationError>>;
}

impl<T: Animator + ?Sized> Animator for Arc<T> {
    fn animate(
        &self,
        audio: AudioArtifact,
        emotion: EmotionLabel,
    ) -> BoxFuture<'_, Result<VideoArtifact, AnimationError>> {
        (**self).animate(audio, emotion)
    }
}

pub fn video_artifact_path(output_dir: &Path, sequence: u64) -> PathBuf {
    output_dir.join(format!("turn_{sequence}.mp4"))
}
