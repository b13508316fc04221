use crate::decode::{AudioDecoder, DecodeError, MonoPcm, Result};
use ffmpeg_sidecar::{download, paths::ffmpeg_path};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;

/// Decodes any container ffmpeg understands, resampling in ffmpeg itself.
#[derive(Clone, Debug, Default)]
pub struct FfmpegAudioDecoder;

impl FfmpegAudioDecoder {
    pub fn new() -> Self {
        Self
    }

    fn ensure_ffmpeg_available(&self) -> Result<()> {
        download::auto_download().map_err(|e| DecodeError::FfmpegUnavailable(e.to_string()))
    }

    fn parse_f32le_mono(raw: &[u8]) -> Result<Vec<f32>> {
        if raw.len() % 4 != 0 {
            return Err(DecodeError::InvalidPcm(format!(
                "f32le byte length must be multiple of 4, got {}",
                raw.len()
            )));
        }
        Ok(raw
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }

    async fn decode_with_ffmpeg(&self, path: PathBuf, target_rate: u32) -> Result<Vec<f32>> {
        let rate = target_rate.to_string();
        let output = tokio::process::Command::new(ffmpeg_path())
            .args(["-hide_banner", "-nostdin", "-loglevel", "error", "-i"])
            .arg(&path)
            .args([
                "-vn", "-sn", "-dn", "-ac", "1", "-ar", &rate, "-f", "f32le", "-acodec",
                "pcm_f32le", "pipe:1",
            ])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .output()
            .await
            .map_err(|e| DecodeError::FfmpegFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr_s = String::from_utf8_lossy(&output.stderr).trim().to_owned();
            return Err(DecodeError::FfmpegFailed(format!(
                "exit_code={:?} stderr={stderr_s}",
                output.status.code()
            )));
        }

        Self::parse_f32le_mono(&output.stdout)
    }
}

impl AudioDecoder for FfmpegAudioDecoder {
    fn decode_file(&self, path: PathBuf, target_rate: u32) -> BoxFuture<'_, Result<MonoPcm>> {
        async move {
            if !path.is_file() {
                return Err(DecodeError::Io(format!("{} not found", path.display())));
            }
            self.ensure_ffmpeg_available()?;
            let samples = self.decode_with_ffmpeg(path, target_rate).await?;
            Ok(MonoPcm {
                sample_rate: target_rate,
                samples,
            })
        }
        .boxed()
    }
}
