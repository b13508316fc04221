use crate::animate::{video_artifact_path, AnimationError, Animator, VideoArtifact};
use crate::config::{AnimationTimeout, AnimatorConfig, CommandSpec};
use crate::emotion::EmotionLabel;
use crate::tts::AudioArtifact;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

const LOG_TARGET: &str = "animate::lipsync";

/// Runs a Wav2Lip-style inference script as a supervised child process:
///
/// `program [args..] --checkpoint_path <ckpt> --face <image> --audio <wav> --outfile <mp4>`
///
/// The turn's video counts as produced only when the process exits with
/// status 0 and the output file exists and is non-empty.
#[derive(Clone, Debug)]
pub struct LipSyncAnimator {
    command: CommandSpec,
    checkpoint: PathBuf,
    face: PathBuf,
    faces: BTreeMap<EmotionLabel, PathBuf>,
    output_dir: PathBuf,
    timeout: AnimationTimeout,
}

impl LipSyncAnimator {
    pub fn new(command: CommandSpec, checkpoint: PathBuf, face: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            command,
            checkpoint,
            face,
            faces: BTreeMap::new(),
            output_dir,
            timeout: AnimationTimeout::default(),
        }
    }

    pub fn from_config(config: &AnimatorConfig, output_dir: PathBuf) -> Self {
        Self {
            command: config.command.clone(),
            checkpoint: config.checkpoint.clone(),
            face: config.face.clone(),
            faces: config.faces.clone(),
            output_dir,
            timeout: config.timeout,
        }
    }

    pub fn with_face_for(mut self, emotion: EmotionLabel, face: PathBuf) -> Self {
        self.faces.insert(emotion, face);
        self
    }

    pub fn with_timeout(mut self, timeout: AnimationTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn face_for(&self, emotion: EmotionLabel) -> &Path {
        self.faces.get(&emotion).unwrap_or(&self.face).as_path()
    }

    fn require(path: &Path) -> Result<(), AnimationError> {
        if path.is_file() {
            Ok(())
        } else {
            Err(AnimationError::MissingInput(path.to_path_buf()))
        }
    }

    async fn run(&self, audio: &Path, face: &Path, outfile: &Path) -> Result<(), AnimationError> {
        let child = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg("--checkpoint_path")
            .arg(&self.checkpoint)
            .arg("--face")
            .arg(face)
            .arg("--audio")
            .arg(audio)
            .arg("--outfile")
            .arg(outfile)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                let path = self.command.program.display();
                AnimationError::Spawn(format!("{path}: {e}"))
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let waited = match self.timeout.get() {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| AnimationError::Timeout(limit))?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|e| AnimationError::Spawn(e.to_string()))?;

        if !output.status.success() {
            return Err(AnimationError::Exited {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }
        Ok(())
    }
}

impl Animator for LipSyncAnimator {
    fn animate(
        &self,
        audio: AudioArtifact,
        emotion: EmotionLabel,
    ) -> BoxFuture<'_, Result<VideoArtifact, AnimationError>> {
        async move {
            let face = self.face_for(emotion).to_path_buf();
            Self::require(&audio.path)?;
            Self::require(&face)?;
            Self::require(&self.checkpoint)?;

            tokio::fs::create_dir_all(&self.output_dir)
                .await
                .map_err(|e| AnimationError::Spawn(format!("{}: {e}", self.output_dir.display())))?;
            let outfile = video_artifact_path(&self.output_dir, audio.sequence);
            // A stale file from an earlier run must not pass the existence check.
            let _ = tokio::fs::remove_file(&outfile).await;

            tracing::info!(
                target: LOG_TARGET,
                turn = audio.sequence,
                face = %face.display(),
                audio = %audio.path.display(),
                "animating"
            );
            let started = std::time::Instant::now();
            self.run(&audio.path, &face, &outfile).await?;

            let produced = tokio::fs::metadata(&outfile)
                .await
                .map(|m| m.is_file() && m.len() > 0)
                .unwrap_or(false);
            if !produced {
                return Err(AnimationError::MissingOutput(outfile));
            }

            tracing::info!(
                target: LOG_TARGET,
                turn = audio.sequence,
                elapsed_ms = started.elapsed().as_millis() as u64,
                path = %outfile.display(),
                "video artifact written"
            );
            Ok(VideoArtifact {
                sequence: audio.sequence,
                path: outfile,
            })
        }
        .boxed()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
        audio: AudioArtifact,
        face: PathBuf,
        checkpoint: PathBuf,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let audio_path = dir.path().join("turn_3.wav");
        let face = dir.path().join("face.jpeg");
        let checkpoint = dir.path().join("wav2lip.pth");
        for p in [&audio_path, &face, &checkpoint] {
            std::fs::write(p, b"x").unwrap();
        }
        Fixture {
            audio: AudioArtifact {
                sequence: 3,
                path: audio_path,
                sample_rate_hz: 16_000,
                sample_count: 1,
            },
            face,
            checkpoint,
            dir,
        }
    }

    // $1..$8 = --checkpoint_path ckpt --face img --audio wav --outfile out
    fn animator(fx: &Fixture, script: &str) -> LipSyncAnimator {
        LipSyncAnimator::new(
            CommandSpec {
                program: PathBuf::from("sh"),
                args: vec!["-c".into(), script.into(), "inference".into()],
            },
            fx.checkpoint.clone(),
            fx.face.clone(),
            fx.dir.path().join("out"),
        )
    }

    #[tokio::test]
    async fn produces_turn_named_video() {
        let fx = fixture();
        let a = animator(&fx, r#"echo video > "$8""#);
        let video = a.animate(fx.audio.clone(), EmotionLabel::Happy).await.unwrap();
        assert_eq!(video.sequence, 3);
        assert_eq!(video.path, fx.dir.path().join("out").join("turn_3.mp4"));
        assert!(video.path.is_file());
    }

    #[tokio::test]
    async fn non_zero_exit_is_animation_error() {
        let fx = fixture();
        let a = animator(&fx, r#"echo video > "$8"; echo cuda oom >&2; exit 1"#);
        let err = a.animate(fx.audio.clone(), EmotionLabel::Happy).await.unwrap_err();
        match err {
            AnimationError::Exited { stderr, .. } => assert_eq!(stderr, "cuda oom"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn success_without_output_is_animation_error() {
        let fx = fixture();
        let a = animator(&fx, "exit 0");
        let err = a.animate(fx.audio.clone(), EmotionLabel::Happy).await.unwrap_err();
        assert!(matches!(err, AnimationError::MissingOutput(_)));
    }

    #[tokio::test]
    async fn missing_audio_is_rejected_before_spawn() {
        let fx = fixture();
        let a = animator(&fx, r#"echo video > "$8""#);
        let mut audio = fx.audio.clone();
        audio.path = fx.dir.path().join("nope.wav");
        let err = a.animate(audio, EmotionLabel::Happy).await.unwrap_err();
        assert!(matches!(err, AnimationError::MissingInput(_)));
    }

    #[tokio::test]
    async fn missing_face_is_rejected() {
        let fx = fixture();
        let a = animator(&fx, r#"echo video > "$8""#)
            .with_face_for(EmotionLabel::Sad, fx.dir.path().join("sad.jpeg"));
        let err = a.animate(fx.audio.clone(), EmotionLabel::Sad).await.unwrap_err();
        assert!(matches!(err, AnimationError::MissingInput(p) if p.ends_with("sad.jpeg")));
    }

    #[tokio::test]
    async fn emotion_selects_reference_face() {
        let fx = fixture();
        let sad_face = fx.dir.path().join("sad.jpeg");
        std::fs::write(&sad_face, b"x").unwrap();
        let a = animator(&fx, r#"case "$4" in *sad.jpeg) echo v > "$8";; *) exit 9;; esac"#)
            .with_face_for(EmotionLabel::Sad, sad_face.clone());
        assert_eq!(a.face_for(EmotionLabel::Sad), sad_face.as_path());
        assert_eq!(a.face_for(EmotionLabel::Happy), fx.face.as_path());
        a.animate(fx.audio.clone(), EmotionLabel::Sad).await.unwrap();
    }

    #[tokio::test]
    async fn hung_animator_times_out() {
        let fx = fixture();
        let a = animator(&fx, "sleep 10")
            .with_timeout(AnimationTimeout::from_duration(Duration::from_millis(200)));
        let started = std::time::Instant::now();
        let err = a.animate(fx.audio.clone(), EmotionLabel::Happy).await.unwrap_err();
        assert!(matches!(err, AnimationError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
