use crate::capture::{CaptureError, Transcriber};
use crate::config::CommandSpec;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Speech-to-text behind a process boundary: `program [args..] <wav>`,
/// transcript on stdout.
#[derive(Clone, Debug)]
pub struct CommandTranscriber {
    command: CommandSpec,
}

impl CommandTranscriber {
    pub fn new(command: CommandSpec) -> Self {
        Self { command }
    }
}

impl Transcriber for CommandTranscriber {
    fn transcribe(&self, audio: PathBuf) -> BoxFuture<'_, Result<String, CaptureError>> {
        async move {
            let output = Command::new(&self.command.program)
                .args(&self.command.args)
                .arg(&audio)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| {
                    let path = self.command.program.display();
                    CaptureError::Transcription(format!("failed to run {path}: {e}"))
                })?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(CaptureError::Transcription(format!(
                    "exited with {}: {}",
                    output.status,
                    stderr.trim()
                )));
            }

            let text = String::from_utf8_lossy(&output.stdout).trim().to_owned();
            if text.is_empty() {
                return Err(CaptureError::SpeechNotUnderstood);
            }
            tracing::debug!(transcript = %text, "transcription");
            Ok(text)
        }
        .boxed()
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn script(body: &str) -> CommandTranscriber {
        CommandTranscriber::new(CommandSpec {
            program: PathBuf::from("sh"),
            args: vec!["-c".into(), body.into(), "stt".into()],
        })
    }

    #[tokio::test]
    async fn returns_trimmed_transcript() {
        let t = script(r#"echo "  I lost my keys ""#);
        let text = t.transcribe(PathBuf::from("in.wav")).await.unwrap();
        assert_eq!(text, "I lost my keys");
    }

    #[tokio::test]
    async fn no_output_is_speech_not_understood() {
        let err = script("true").transcribe(PathBuf::from("in.wav")).await.unwrap_err();
        assert!(matches!(err, CaptureError::SpeechNotUnderstood));
    }

    #[tokio::test]
    async fn service_failure_is_transcription_error() {
        let err = script("echo quota >&2; exit 1")
            .transcribe(PathBuf::from("in.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, CaptureError::Transcription(_)));
    }
}
