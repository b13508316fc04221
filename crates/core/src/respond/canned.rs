use crate::emotion::EmotionLabel;
use crate::respond::{ResponseError, ResponseGenerator};
use futures::future::BoxFuture;
use futures::FutureExt;

/// Offline responder for running without an API key.
#[derive(Clone, Debug, Default)]
pub struct CannedResponder;

impl CannedResponder {
    pub fn new() -> Self {
        Self
    }

    fn opener(emotion: EmotionLabel) -> &'static str {
        match emotion {
            EmotionLabel::Neutral => "Thanks for sharing that with me.",
            EmotionLabel::Happy => "That is wonderful to hear, I am glad for you!",
            EmotionLabel::Sad => "I am sorry you are going through this, that sounds hard.",
            EmotionLabel::Angry => "I can tell this really frustrates you, and that is fair.",
            EmotionLabel::Fear => "That sounds worrying, but you are not alone in this.",
            EmotionLabel::Love => "That is so sweet, it sounds like it means a lot to you.",
            EmotionLabel::Surprise => "Wow, I did not see that coming either!",
        }
    }
}

impl ResponseGenerator for CannedResponder {
    fn generate(
        &self,
        prompt: String,
        emotion: EmotionLabel,
    ) -> BoxFuture<'_, Result<String, ResponseError>> {
        async move {
            let topic: String = prompt
                .split_whitespace()
                .take(6)
                .collect::<Vec<_>>()
                .join(" ");
            if topic.is_empty() {
                return Err(ResponseError::EmptyResponse);
            }
            Ok(format!(
                "{} Tell me more about \"{topic}\" whenever you like.",
                Self::opener(emotion)
            ))
        }
        .boxed()
    }
}
