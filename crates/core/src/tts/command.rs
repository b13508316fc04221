use crate::tts::{SynthesisError, TtsBackend, TtsRequest, TtsWaveform};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io::{Cursor, ErrorKind};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Description-conditioned TTS model behind a process boundary.
///
/// Runs `program [args..] --description <style>`, writes the reply text to
/// stdin and expects a WAV file on stdout. The sample rate is whatever the
/// WAV header reports.
#[derive(Clone, Debug)]
pub struct CommandTtsBackend {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandTtsBackend {
    #[must_use]
    pub fn new(program: PathBuf, args: Vec<String>) -> Self {
        Self { program, args }
    }

    fn parse_wav(bytes: &[u8]) -> Result<TtsWaveform, SynthesisError> {
        let mut reader = hound::WavReader::new(Cursor::new(bytes))
            .map_err(|e| SynthesisError::Backend(format!("tts output is not a wav: {e}")))?;
        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| SynthesisError::Backend(e.to_string()))?,
            hound::SampleFormat::Int => {
                let scale = 1.0f32 / (1i64 << spec.bits_per_sample.saturating_sub(1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| SynthesisError::Backend(e.to_string()))?
            }
        };

        Ok(TtsWaveform {
            sample_rate_hz: spec.sample_rate,
            samples: crate::decode::downmix(&interleaved, spec.channels),
        })
    }
}

impl TtsBackend for CommandTtsBackend {
    fn generate(&self, request: TtsRequest) -> BoxFuture<'_, Result<TtsWaveform, SynthesisError>> {
        async move {
            let mut child = Command::new(&self.program)
                .args(&self.args)
                .arg("--description")
                .arg(&request.style_description)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .spawn()
                .map_err(|e| {
                    let path = self.program.display();
                    SynthesisError::Backend(format!("failed to spawn tts at {path}: {e}"))
                })?;

            {
                let stdin = child
                    .stdin
                    .as_mut()
                    .ok_or_else(|| SynthesisError::Backend("failed to open tts stdin".into()))?;
                // A child that exits early closes the pipe; its status and
                // stderr below say why.
                match stdin.write_all(request.text.as_bytes()).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                        tracing::debug!(target: super::LOG_TARGET, "tts closed stdin early");
                    }
                    Err(e) => {
                        return Err(SynthesisError::Backend(format!("tts stdin write failed: {e}")));
                    }
                }
            }
            child.stdin.take();

            let output = child
                .wait_with_output()
                .await
                .map_err(|e| SynthesisError::Backend(format!("tts process failed: {e}")))?;

            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let status = output.status;
                return Err(SynthesisError::Backend(format!(
                    "tts exited with {status}: {}",
                    stderr.trim()
                )));
            }
            if output.stdout.is_empty() {
                return Err(SynthesisError::EmptyWaveform);
            }

            Self::parse_wav(&output.stdout)
        }
        .boxed()
    }
}
