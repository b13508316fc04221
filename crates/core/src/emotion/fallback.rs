use crate::emotion::{EmotionClassifier, EmotionError, EmotionLabel};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::path::PathBuf;

const LOG_TARGET: &str = "emotion::fallback";

/// Classification is advisory: any failure of the inner classifier turns
/// into the configured default label.
#[derive(Clone)]
pub struct DefaultingClassifier<C> {
    inner: C,
    default_label: EmotionLabel,
}

impl<C> DefaultingClassifier<C>
where
    C: EmotionClassifier,
{
    pub fn new(inner: C, default_label: EmotionLabel) -> Self {
        Self {
            inner,
            default_label,
        }
    }

    pub fn default_label(&self) -> EmotionLabel {
        self.default_label
    }

    fn settle(&self, kind: &str, result: Result<EmotionLabel, EmotionError>) -> EmotionLabel {
        match result {
            Ok(label) => label,
            Err(e) => {
                tracing::warn!(
                    target: LOG_TARGET,
                    input = kind,
                    error = %e,
                    default = %self.default_label,
                    "emotion classification failed, using default"
                );
                self.default_label
            }
        }
    }

    pub async fn text_or_default(&self, text: String) -> EmotionLabel {
        let result = self.inner.classify_text(text).await;
        self.settle("text", result)
    }

    pub async fn audio_or_default(&self, path: PathBuf) -> EmotionLabel {
        let result = self.inner.classify_audio(path).await;
        self.settle("audio", result)
    }
}

impl<C> EmotionClassifier for DefaultingClassifier<C>
where
    C: EmotionClassifier,
{
    fn classify_text(&self, text: String) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        async move { Ok(self.text_or_default(text).await) }.boxed()
    }

    fn classify_audio(&self, path: PathBuf) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
        async move { Ok(self.audio_or_default(path).await) }.boxed()
    }
}
