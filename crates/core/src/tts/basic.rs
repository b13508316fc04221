use crate::tts::{SynthesisError, TtsBackend, TtsRequest, TtsWaveform};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::f32::consts::PI;

const TONE_SAMPLE_RATE: u32 = 22_050;
const MS_PER_WORD: usize = 320;

/// Offline stand-in for a speech model: one tone per word, pitched and
/// paced from the style description.
#[derive(Clone, Debug, Default)]
pub struct ToneTtsBackend;

impl ToneTtsBackend {
    pub fn new() -> Self {
        Self
    }

    fn voice_for(style: &str) -> (f32, f32) {
        let style = style.to_lowercase();
        let freq = if style.contains("high-pitched") {
            330.0
        } else if style.contains("melancholic") || style.contains("slow") {
            165.0
        } else if style.contains("loud") || style.contains("cheerful") {
            262.0
        } else {
            220.0
        };
        let pace = if style.contains("slow") {
            1.4
        } else if style.contains("fast") || style.contains("sudden") {
            0.8
        } else {
            1.0
        };
        (freq, pace)
    }
}

impl TtsBackend for ToneTtsBackend {
    fn generate(&self, request: TtsRequest) -> BoxFuture<'_, Result<TtsWaveform, SynthesisError>> {
        async move {
            let words = request.text.split_whitespace().count();
            if words == 0 {
                return Err(SynthesisError::EmptyText);
            }
            let (freq, pace) = Self::voice_for(&request.style_description);
            let word_samples =
                ((MS_PER_WORD as f32 * pace) as usize * TONE_SAMPLE_RATE as usize) / 1000;
            let gap = word_samples / 5;

            let mut samples = Vec::with_capacity(words * word_samples);
            for w in 0..words {
                // Small per-word pitch drift so the result is not a single beep.
                let f = freq * (1.0 + 0.03 * ((w % 3) as f32 - 1.0));
                for i in 0..word_samples {
                    if i >= word_samples - gap {
                        samples.push(0.0);
                        continue;
                    }
                    let t = i as f32 / TONE_SAMPLE_RATE as f32;
                    samples.push(0.6 * (2.0 * PI * f * t).sin());
                }
            }

            Ok(TtsWaveform {
                sample_rate_hz: TONE_SAMPLE_RATE,
                samples,
            })
        }
        .boxed()
    }
}
