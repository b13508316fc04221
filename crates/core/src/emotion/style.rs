use crate::emotion::EmotionLabel;
use serde::Serialize;

pub const NEUTRAL_STYLE: &str = "A neutral and clear tone, with a standard delivery.";

/// Natural-language voice description handed to the speech model.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct StyleProfile {
    pub emotion: EmotionLabel,
    pub description: &'static str,
}

/// The match is exhaustive over `EmotionLabel`, so adding a label without a
/// style does not compile.
pub fn style_for(emotion: EmotionLabel) -> StyleProfile {
    let description = match emotion {
        EmotionLabel::Neutral => NEUTRAL_STYLE,
        EmotionLabel::Happy => "A cheerful and upbeat tone, with a bright and lively delivery.",
        EmotionLabel::Sad => "A slow and melancholic tone, with a soft and gentle delivery.",
        EmotionLabel::Angry => "A loud and intense tone, with a forceful and aggressive delivery.",
        EmotionLabel::Fear => "A trembling and cautious tone, with a hesitant and shaky delivery.",
        EmotionLabel::Love => "A warm and tender tone, with an affectionate and soft delivery.",
        EmotionLabel::Surprise => {
            "A high-pitched and excited tone, with a sudden and emphatic delivery."
        }
    };
    StyleProfile {
        emotion,
        description,
    }
}

/// Looks up a style by raw label text; anything unrecognised gets the
/// neutral style.
pub fn style_for_name(raw: &str) -> StyleProfile {
    match EmotionLabel::parse_lenient(raw) {
        Some(label) => style_for(label),
        None => StyleProfile {
            emotion: EmotionLabel::Neutral,
            description: NEUTRAL_STYLE,
        },
    }
}
