use crate::emotion::{EmotionClassifier, EmotionError, EmotionLabel};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

const LOG_TARGET: &str = "emotion::command";

/// Runs an external inference program that hosts the trained models.
///
/// Invocation is `program [args..] text` with the text on stdin, or
/// `program [args..] audio <path>`. The first non-empty stdout line is
/// taken as the label, in either model's spelling.
#[derive(Clone, Debug)]
pub struct CommandClassifier {
    program: PathBuf,
    args: Vec<String>,
    model_path: Option<PathBuf>,
    default_label: EmotionLabel,
}

impl CommandClassifier {
    pub fn new(program: PathBuf, args: Vec<String>, default_label: EmotionLabel) -> Self {
        Self {
            program,
            args,
            model_path: None,
            default_label,
        }
    }

    /// Checked before every call so a missing checkpoint reports as an
    /// inference failure instead of whatever the program prints.
    pub fn with_model_path(mut self, model_path: PathBuf) -> Self {
        self.model_path = Some(model_path);
        self
    }

    fn parse_label(&self, stdout: &[u8]) -> EmotionLabel {
        let text = String::from_utf8_lossy(stdout);
        let line = text.lines().map(str::trim).find(|l| !l.is_empty());
        match line.and_then(EmotionLabel::parse_lenient) {
            Some(label) => label,
            None => {
                tracing::warn!(
                    target: LOG_TARGET,
                    output = ?line,
                    default = %self.default_label,
                    "classifier returned an unknown label"
                );
                self.default_label
            }
        }
    }

    async fn run(&self, mode: &str, extra: Option<PathBuf>, stdin_text: Option<String>) -> Result<EmotionLabel, EmotionError> {
        if let Some(model) = &self.model_path {
            if !model.is_file() {
                return Err(EmotionError::Inference(format!(
                    "model artifact {} not found",
                    model.display()
                )));
            }
        }

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(mode);
        if let Some(path) = &extra {
            cmd.arg(path);
        }
        let mut child = cmd
            .stdin(if stdin_text.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                let path = self.program.display();
                EmotionError::Inference(format!("failed to spawn classifier at {path}: {e}"))
            })?;

        if let Some(text) = stdin_text {
            let mut stdin = child
                .stdin
                .take()
                .ok_or_else(|| EmotionError::Inference("failed to open classifier stdin".into()))?;
            match stdin.write_all(text.as_bytes()).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    tracing::debug!(target: LOG_TARGET, "classifier closed stdin early");
                }
                Err(e) => {
                    return Err(EmotionError::Inference(format!(
                        "classifier stdin write failed: {e}"
                    )));
                }
            }
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| EmotionError::Inference(format!("classifier process failed: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let status = output.status;
            return Err(EmotionError::Inference(format!(
                "classifier exited with {status}: {}",
                stderr.trim()
            )));
        }

        Ok(self.parse_label(&output.stdout))
    }
}

impl EmotionClassifier for CommandClassifier {
    fn classify_text(&self, text: String) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        async move {
            if text.trim().is_empty() {
                return Err(EmotionError::InvalidInput("text is empty".to_owned()));
            }
            self.run("text", None, Some(text)).await
        }
        .boxed()
    }

    fn classify_audio(&self, path: PathBuf) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        async move {
            let len = tokio::fs::metadata(&path)
                .await
                .map_err(|e| EmotionError::InvalidInput(format!("{}: {e}", path.display())))?
                .len();
            if len == 0 {
                return Err(EmotionError::InvalidInput(format!(
                    "{} is empty",
                    path.display()
                )));
            }
            self.run("audio", Some(path), None).await
        }
        .boxed()
    }
}
