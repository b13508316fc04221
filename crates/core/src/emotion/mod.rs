mod analyzer;
mod command;
mod fallback;
mod style;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

pub use analyzer::{
    EmotionClassifier, EmotionError, KeywordTextClassifier, ProsodyAudioClassifier,
};
pub use command::CommandClassifier;
pub use fallback::DefaultingClassifier;
pub use style::{style_for, style_for_name, StyleProfile, NEUTRAL_STYLE};

/// The one label set every stage after classification works with.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmotionLabel {
    Neutral,
    Happy,
    Sad,
    Angry,
    Fear,
    Love,
    Surprise,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 7] = [
        EmotionLabel::Neutral,
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Fear,
        EmotionLabel::Love,
        EmotionLabel::Surprise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Neutral => "Neutral",
            EmotionLabel::Happy => "Happy",
            EmotionLabel::Sad => "Sad",
            EmotionLabel::Angry => "Angry",
            EmotionLabel::Fear => "Fear",
            EmotionLabel::Love => "Love",
            EmotionLabel::Surprise => "Surprise",
        }
    }

    /// Accepts the spelling of either classifier's label set, plus a few
    /// common synonyms. Case and surrounding whitespace are ignored.
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        let label = match lower.as_str() {
            "neutral" | "calm" => EmotionLabel::Neutral,
            "happy" | "joy" | "joyful" | "happiness" => EmotionLabel::Happy,
            "sad" | "sadness" => EmotionLabel::Sad,
            "angry" | "anger" => EmotionLabel::Angry,
            "fear" | "fearful" | "afraid" | "anxious" => EmotionLabel::Fear,
            "love" => EmotionLabel::Love,
            "surprise" | "surprised" => EmotionLabel::Surprise,
            _ => return None,
        };
        Some(label)
    }
}

impl Default for EmotionLabel {
    fn default() -> Self {
        EmotionLabel::Neutral
    }
}

impl fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classes emitted by the audio model, in output-index order.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum AudioEmotion {
    Angry,
    Happy,
    Neutral,
    Sad,
    Surprise,
}

impl AudioEmotion {
    pub fn from_class_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(AudioEmotion::Angry),
            1 => Some(AudioEmotion::Happy),
            2 => Some(AudioEmotion::Neutral),
            3 => Some(AudioEmotion::Sad),
            4 => Some(AudioEmotion::Surprise),
            _ => None,
        }
    }
}

impl From<AudioEmotion> for EmotionLabel {
    fn from(value: AudioEmotion) -> Self {
        match value {
            AudioEmotion::Angry => EmotionLabel::Angry,
            AudioEmotion::Happy => EmotionLabel::Happy,
            AudioEmotion::Neutral => EmotionLabel::Neutral,
            AudioEmotion::Sad => EmotionLabel::Sad,
            AudioEmotion::Surprise => EmotionLabel::Surprise,
        }
    }
}

/// Classes emitted by the text model.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TextEmotion {
    Joy,
    Sad,
    Anger,
    Fear,
    Love,
    Surprise,
}

impl From<TextEmotion> for EmotionLabel {
    fn from(value: TextEmotion) -> Self {
        match value {
            TextEmotion::Joy => EmotionLabel::Happy,
            TextEmotion::Sad => EmotionLabel::Sad,
            TextEmotion::Anger => EmotionLabel::Angry,
            TextEmotion::Fear => EmotionLabel::Fear,
            TextEmotion::Love => EmotionLabel::Love,
            TextEmotion::Surprise => EmotionLabel::Surprise,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProsodyFeatures {
    pub energy_rms: f32,
    pub pitch_hz: Option<f32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProsodyWindow {
    pub duration: Duration,
    pub features: ProsodyFeatures,
}
