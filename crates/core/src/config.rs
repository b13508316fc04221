use crate::emotion::EmotionLabel;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, path::PathBuf, time::Duration};

pub const DEFAULT_MIN_WORDS: usize = 10;
pub const DEFAULT_MAX_WORDS: usize = 30;
pub const DEFAULT_RECORD_SECS: u64 = 10;
pub const DEFAULT_ANIMATION_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_OUTPUT_DIR: &str = "results";
pub const DEFAULT_AUDIO_IN_DIR: &str = "audio_in";
pub const DEFAULT_CHECKPOINT: &str = "checkpoints/wav2lip.pth";
pub const DEFAULT_FACE: &str = "input_image.jpeg";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_OUTPUT_DIR: &str = "CHATTY_OUTPUT_DIR";
pub const ENV_TTS_COMMAND: &str = "CHATTY_TTS_COMMAND";
pub const ENV_ANIMATOR_COMMAND: &str = "CHATTY_ANIMATOR_COMMAND";
pub const ENV_TRANSCRIBER_COMMAND: &str = "CHATTY_TRANSCRIBER_COMMAND";
pub const ENV_CLASSIFIER_COMMAND: &str = "CHATTY_CLASSIFIER_COMMAND";
pub const ENV_CLASSIFIER_MODEL: &str = "CHATTY_CLASSIFIER_MODEL";

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

/// Reply length requested from the language model. Advisory only.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordRange {
    pub min: usize,
    pub max: usize,
}

impl WordRange {
    pub fn new(min: usize, max: usize) -> Result<Self, ConfigError> {
        if min == 0 || min > max {
            return Err(ConfigError::InvalidWordRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, words: usize) -> bool {
        (self.min..=self.max).contains(&words)
    }
}

impl Default for WordRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_WORDS,
            max: DEFAULT_MAX_WORDS,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordDuration {
    pub secs: u64,
}

impl RecordDuration {
    pub fn new(secs: u64) -> Result<Self, ConfigError> {
        if secs == 0 {
            return Err(ConfigError::ZeroRecordDuration);
        }
        Ok(Self { secs })
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.secs)
    }

    pub fn frames_for_sample_rate(&self, sample_rate_hz: u32) -> u64 {
        self.secs.saturating_mul(u64::from(sample_rate_hz))
    }
}

impl Default for RecordDuration {
    fn default() -> Self {
        Self {
            secs: DEFAULT_RECORD_SECS,
        }
    }
}

/// `None` waits for the animator indefinitely.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnimationTimeout(Option<Duration>);

impl AnimationTimeout {
    pub fn from_secs(secs: u64) -> Self {
        if secs == 0 {
            Self(None)
        } else {
            Self(Some(Duration::from_secs(secs)))
        }
    }

    pub fn from_duration(d: Duration) -> Self {
        Self(Some(d))
    }

    pub fn disabled() -> Self {
        Self(None)
    }

    pub fn get(&self) -> Option<Duration> {
        self.0
    }
}

impl Default for AnimationTimeout {
    fn default() -> Self {
        Self::from_secs(DEFAULT_ANIMATION_TIMEOUT_SECS)
    }
}

/// An external program plus the leading arguments it is always run with.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Splits on whitespace; quoting is not supported.
    pub fn parse(line: &str) -> Result<Self, ConfigError> {
        let mut parts = line.split_whitespace();
        let program = parts.next().ok_or(ConfigError::EmptyCommand)?;
        Ok(Self {
            program: PathBuf::from(program),
            args: parts.map(str::to_owned).collect(),
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct LlmConfig {
    pub api_key: Option<ApiKey>,
    pub model: String,
    pub base_url: String,
    pub words: WordRange,
    pub offline: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnimatorConfig {
    pub command: CommandSpec,
    pub checkpoint: PathBuf,
    pub face: PathBuf,
    pub faces: BTreeMap<EmotionLabel, PathBuf>,
    pub timeout: AnimationTimeout,
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            command: CommandSpec {
                program: PathBuf::from("python"),
                args: vec!["inference.py".to_owned()],
            },
            checkpoint: PathBuf::from(DEFAULT_CHECKPOINT),
            face: PathBuf::from(DEFAULT_FACE),
            faces: BTreeMap::new(),
            timeout: AnimationTimeout::default(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub llm: LlmConfig,
    pub output_dir: PathBuf,
    pub audio_in_dir: PathBuf,
    pub record: RecordDuration,
    pub default_emotion: EmotionLabel,
    pub tts_command: Option<CommandSpec>,
    pub classifier_command: Option<CommandSpec>,
    pub classifier_model: Option<PathBuf>,
    pub transcriber_command: Option<CommandSpec>,
    pub animator: AnimatorConfig,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("api key must not be empty")]
    EmptyApiKey,
    #[error("word range {min}..={max} is invalid (need 1 <= min <= max)")]
    InvalidWordRange { min: usize, max: usize },
    #[error("recording duration must be > 0 s")]
    ZeroRecordDuration,
    #[error("command must not be empty")]
    EmptyCommand,
    #[error("unknown emotion label: {0}")]
    UnknownEmotion(String),
    #[error("face override must look like <emotion>=<path>, got {0}")]
    InvalidFaceOverride(String),
}

pub fn parse_emotion(raw: &str) -> Result<EmotionLabel, ConfigError> {
    EmotionLabel::parse_lenient(raw).ok_or_else(|| ConfigError::UnknownEmotion(raw.to_owned()))
}

/// Parses `sad=faces/sad.jpeg` style overrides.
pub fn parse_face_override(raw: &str) -> Result<(EmotionLabel, PathBuf), ConfigError> {
    let (label, path) = raw
        .split_once('=')
        .ok_or_else(|| ConfigError::InvalidFaceOverride(raw.to_owned()))?;
    if path.trim().is_empty() {
        return Err(ConfigError::InvalidFaceOverride(raw.to_owned()));
    }
    Ok((parse_emotion(label)?, PathBuf::from(path.trim())))
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}

pub fn resolve_optional_string(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Option<String> {
    match cli_value {
        Some(v) => Some(v),
        None => env.var(env_key),
    }
}

pub fn resolve_command(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<CommandSpec>, ConfigError> {
    resolve_optional_string(cli_value, env_key, env)
        .map(|line| CommandSpec::parse(&line))
        .transpose()
}
