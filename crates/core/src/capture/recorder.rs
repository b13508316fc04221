use crate::capture::{CaptureError, RecordRequest, Recorder};
use crate::decode::{AudioDecoder, MonoPcm};
use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::watch;

/// Recording format: 16-bit mono at 44.1 kHz.
pub const CAPTURE_SAMPLE_RATE: u32 = 44_100;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordedClip {
    pub path: PathBuf,
    pub duration: Duration,
}

/// Cuts the capture window out of a pre-recorded file and stores it in the
/// recording format. Stands in for a live input device.
#[derive(Clone, Debug)]
pub struct ClipRecorder<D> {
    decoder: D,
}

impl<D> ClipRecorder<D>
where
    D: AudioDecoder,
{
    pub fn new(decoder: D) -> Self {
        Self { decoder }
    }

    fn write_clip(
        dest: &Path,
        pcm: &MonoPcm,
        frames: usize,
        progress: &watch::Sender<u8>,
    ) -> Result<(), hound::Error> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: pcm.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(dest, spec)?;
        let chunk = (pcm.sample_rate as usize).max(1);
        let mut written = 0usize;
        for block in pcm.samples[..frames].chunks(chunk) {
            for s in block {
                let v = (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
                writer.write_sample(v)?;
            }
            written += block.len();
            let pct = (written * 100 / frames.max(1)).min(100) as u8;
            let _ = progress.send(pct);
        }
        writer.finalize()?;
        let _ = progress.send(100);
        Ok(())
    }
}

impl<D> Recorder for ClipRecorder<D>
where
    D: AudioDecoder,
{
    fn record(
        &self,
        request: RecordRequest,
        progress: watch::Sender<u8>,
    ) -> BoxFuture<'_, Result<RecordedClip, CaptureError>> {
        async move {
            let source = request.source.ok_or_else(|| {
                CaptureError::InvalidInput("clip recorder needs a source file".to_owned())
            })?;
            let pcm = self
                .decoder
                .decode_file(source.clone(), CAPTURE_SAMPLE_RATE)
                .await
                .map_err(|e| CaptureError::InvalidInput(format!("{}: {e}", source.display())))?;

            let limit = usize::try_from(request.duration.frames_for_sample_rate(pcm.sample_rate))
                .unwrap_or(usize::MAX);
            let frames = pcm.samples.len().min(limit);
            let duration = crate::decode::duration_from_samples(pcm.sample_rate, frames);

            let dest = request.dest;
            let write_dest = dest.clone();
            tokio::task::spawn_blocking(move || {
                Self::write_clip(&write_dest, &pcm, frames, &progress)
            })
            .await
            .map_err(|e| CaptureError::Recording(e.to_string()))?
            .map_err(|e| CaptureError::Recording(e.to_string()))?;

            Ok(RecordedClip {
                path: dest,
                duration,
            })
        }
        .boxed()
    }
}
