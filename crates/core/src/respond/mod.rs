mod canned;
mod gemini;

use crate::config::WordRange;
use crate::emotion::EmotionLabel;
use futures::future::BoxFuture;
use std::sync::Arc;

pub use canned::CannedResponder;
pub use gemini::{GeminiResponder, DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};

#[derive(thiserror::Error, Debug)]
pub enum ResponseError {
    #[error("language model unavailable, try again: {0}")]
    UpstreamUnavailable(String),

    #[error("language model returned no text")]
    EmptyResponse,

    #[error("language model rejected the request: {0}")]
    Api(String),

    #[error("invalid language model response: {0}")]
    InvalidResponse(String),
}

/// Produces a short reply to `prompt` taking the speaker's emotion into
/// account. Output is nondeterministic and its length only advisory.
pub trait ResponseGenerator: Send + Sync {
    fn generate(
        &self,
        prompt: String,
        emotion: EmotionLabel,
    ) -> BoxFuture<'_, Result<String, ResponseError>>;
}

impl<T: ResponseGenerator + ?Sized> ResponseGenerator for Arc<T> {
    fn generate(
        &self,
        prompt: String,
        emotion: EmotionLabel,
    ) -> BoxFuture<'_, Result<String, ResponseError>> {
        (**self).generate(prompt, emotion)
    }
}

pub fn compose_prompt(prompt: &str, emotion: EmotionLabel, words: WordRange) -> String {
    format!(
        "{prompt} | request: keep the answer between {} and {} words! | Take into account that user is in emotion {emotion}",
        words.min, words.max
    )
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_length_and_emotion_instructions() {
        let p = compose_prompt("I lost my keys", EmotionLabel::Sad, WordRange::default());
        assert!(p.starts_with("I lost my keys | "));
        assert!(p.contains("between 10 and 30 words"));
        assert!(p.ends_with("user is in emotion Sad"));
    }

    #[test]
    fn word_count_ignores_extra_whitespace() {
        assert_eq!(word_count("  one  two\nthree "), 3);
        assert_eq!(word_count(""), 0);
    }
}
