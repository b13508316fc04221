use crate::animate::VideoArtifact;
use crate::emotion::EmotionLabel;
use crate::tts::AudioArtifact;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Stage {
    Generation,
    Synthesis,
    Animation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Generation => "generation",
            Stage::Synthesis => "synthesis",
            Stage::Animation => "animation",
        })
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum TurnState {
    Idle,
    EmotionDetected,
    ResponseReady,
    AudioReady,
    VideoReady,
    Failed(Stage),
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::VideoReady | TurnState::Failed(_))
    }
}

/// Where a turn's emotion label came from.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmotionSource {
    /// Captured alongside recorded speech and handed to this turn.
    Handoff,
    Audio,
    Text,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TurnInput {
    pub text: String,
    pub audio: Option<PathBuf>,
}

impl TurnInput {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            audio: None,
        }
    }

    pub fn with_audio(mut self, audio: PathBuf) -> Self {
        self.audio = Some(audio);
        self
    }
}

/// One conversational exchange, filled in stage by stage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub index: u64,
    pub input_text: String,
    pub input_audio: Option<PathBuf>,
    pub emotion: Option<EmotionLabel>,
    pub emotion_source: Option<EmotionSource>,
    pub reply: Option<String>,
    pub audio: Option<AudioArtifact>,
    pub video: Option<VideoArtifact>,
    pub state: TurnState,
    pub failure: Option<String>,
    pub history: Vec<TurnState>,
}

impl Turn {
    pub fn new(index: u64, input: TurnInput) -> Self {
        Self {
            index,
            input_text: input.text,
            input_audio: input.audio,
            emotion: None,
            emotion_source: None,
            reply: None,
            audio: None,
            video: None,
            state: TurnState::Idle,
            failure: None,
            history: vec![TurnState::Idle],
        }
    }

    pub(crate) fn advance(&mut self, next: TurnState) {
        tracing::debug!(turn = self.index, from = ?self.state, to = ?next, "turn transition");
        self.state = next;
        self.history.push(next);
    }

    pub fn is_complete(&self) -> bool {
        self.state == TurnState::VideoReady
    }

    /// Message for the person at the keyboard when the turn failed.
    pub fn user_message(&self) -> Option<String> {
        match (self.state, &self.failure) {
            (TurnState::Failed(Stage::Generation), Some(reason)) => Some(format!(
                "Could not get a reply ({reason}). Please try again."
            )),
            (TurnState::Failed(stage), Some(reason)) => {
                Some(format!("Turn {} failed during {stage}: {reason}", self.index))
            }
            _ => None,
        }
    }
}
