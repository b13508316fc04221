#![deny(warnings)]

use anyhow::Context;
use chatty_core::animate::LipSyncAnimator;
use chatty_core::capture::{AudioCapture, CapturedInput, ClipRecorder, CommandTranscriber, EmotionHandoff};
use chatty_core::config::{
    parse_emotion, parse_face_override, resolve_api_key, resolve_command,
    resolve_optional_string, resolve_string_with_default, AnimationTimeout, AnimatorConfig,
    AppConfig, Env, LlmConfig, RecordDuration, StdEnv, WordRange, DEFAULT_ANIMATION_TIMEOUT_SECS,
    DEFAULT_AUDIO_IN_DIR, DEFAULT_CHECKPOINT, DEFAULT_FACE, DEFAULT_MAX_WORDS, DEFAULT_MIN_WORDS,
    DEFAULT_OUTPUT_DIR, DEFAULT_RECORD_SECS, ENV_ANIMATOR_COMMAND, ENV_CLASSIFIER_COMMAND,
    ENV_CLASSIFIER_MODEL, ENV_GEMINI_API_KEY, ENV_OUTPUT_DIR, ENV_TRANSCRIBER_COMMAND,
    ENV_TTS_COMMAND,
};
use chatty_core::decode::AudioDecoder;
use chatty_core::emotion::{
    CommandClassifier, DefaultingClassifier, EmotionClassifier, ProsodyAudioClassifier,
};
use chatty_core::orchestrator::{Orchestrator, Turn, TurnError, TurnInput};
use chatty_core::respond::{
    CannedResponder, GeminiResponder, ResponseGenerator, DEFAULT_GEMINI_BASE_URL,
    DEFAULT_GEMINI_MODEL,
};
use chatty_core::tts::{CommandTtsBackend, StyledSpeechSynthesizer, ToneTtsBackend, TtsBackend};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

type Classifier = Arc<dyn EmotionClassifier>;
type Decoder = Arc<dyn AudioDecoder>;
type Chatty = Orchestrator<
    Classifier,
    Arc<dyn ResponseGenerator>,
    StyledSpeechSynthesizer<Arc<dyn TtsBackend>>,
    LipSyncAnimator,
>;
type Capture = AudioCapture<ClipRecorder<Decoder>, CommandTranscriber, Classifier>;

#[derive(Parser, Debug)]
#[command(name = "chatty")]
#[command(about = "Emotion-aware chatbot: classify -> reply -> speak -> animate")]
struct Args {
    #[arg(long)]
    gemini_api_key: Option<String>,

    #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
    gemini_model: String,

    #[arg(long, default_value = DEFAULT_GEMINI_BASE_URL, hide = true)]
    gemini_base_url: String,

    /// Answer with canned replies instead of calling the language model.
    #[arg(long)]
    offline: bool,

    #[arg(long)]
    output_dir: Option<String>,

    #[arg(long, default_value = DEFAULT_AUDIO_IN_DIR)]
    audio_in_dir: PathBuf,

    #[arg(long, default_value_t = DEFAULT_MIN_WORDS)]
    min_words: usize,

    #[arg(long, default_value_t = DEFAULT_MAX_WORDS)]
    max_words: usize,

    #[arg(long, default_value_t = DEFAULT_RECORD_SECS)]
    record_seconds: u64,

    /// Label used whenever emotion classification fails.
    #[arg(long, default_value = "neutral")]
    default_emotion: String,

    #[arg(long)]
    tts_command: Option<String>,

    #[arg(long)]
    classifier_command: Option<String>,

    /// Checkpoint the classifier command loads; checked before each call.
    #[arg(long)]
    classifier_model: Option<String>,

    #[arg(long)]
    transcriber_command: Option<String>,

    #[arg(long)]
    animator_command: Option<String>,

    /// Extra argument appended to the animator command; repeatable.
    #[arg(long = "animator-arg", allow_hyphen_values = true)]
    animator_args: Vec<String>,

    #[arg(long, default_value = DEFAULT_CHECKPOINT)]
    checkpoint: PathBuf,

    #[arg(long, default_value = DEFAULT_FACE)]
    face: PathBuf,

    /// Per-emotion face image, e.g. `--face-for sad=faces/sad.jpeg`.
    #[arg(long = "face-for")]
    face_for: Vec<String>,

    /// 0 disables the limit.
    #[arg(long, default_value_t = DEFAULT_ANIMATION_TIMEOUT_SECS)]
    animation_timeout_secs: u64,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(args, &env)?;

    tracing::info!(
        offline = cfg.llm.offline,
        model = %cfg.llm.model,
        output_dir = %cfg.output_dir.display(),
        default_emotion = %cfg.default_emotion,
        "config loaded"
    );

    run_session(cfg).await
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(args: Args, env: &impl Env) -> anyhow::Result<AppConfig> {
    let words = WordRange::new(args.min_words, args.max_words)?;
    let api_key = resolve_api_key(args.gemini_api_key, ENV_GEMINI_API_KEY, env)?;
    if api_key.is_none() && !args.offline {
        anyhow::bail!("{ENV_GEMINI_API_KEY} is not set; pass --gemini-api-key or run with --offline");
    }

    let mut animator = AnimatorConfig {
        checkpoint: args.checkpoint,
        face: args.face,
        timeout: AnimationTimeout::from_secs(args.animation_timeout_secs),
        ..AnimatorConfig::default()
    };
    if let Some(command) = resolve_command(args.animator_command, ENV_ANIMATOR_COMMAND, env)? {
        animator.command = command;
    }
    animator.command.args.extend(args.animator_args);
    for raw in &args.face_for {
        let (emotion, face) = parse_face_override(raw)?;
        animator.faces.insert(emotion, face);
    }

    Ok(AppConfig {
        llm: LlmConfig {
            api_key,
            model: args.gemini_model,
            base_url: args.gemini_base_url,
            words,
            offline: args.offline,
        },
        output_dir: PathBuf::from(resolve_string_with_default(
            args.output_dir,
            ENV_OUTPUT_DIR,
            env,
            DEFAULT_OUTPUT_DIR,
        )),
        audio_in_dir: args.audio_in_dir,
        record: RecordDuration::new(args.record_seconds)?,
        default_emotion: parse_emotion(&args.default_emotion)?,
        tts_command: resolve_command(args.tts_command, ENV_TTS_COMMAND, env)?,
        classifier_command: resolve_command(args.classifier_command, ENV_CLASSIFIER_COMMAND, env)?,
        classifier_model: resolve_optional_string(args.classifier_model, ENV_CLASSIFIER_MODEL, env)
            .map(PathBuf::from),
        transcriber_command: resolve_command(args.transcriber_command, ENV_TRANSCRIBER_COMMAND, env)?,
        animator,
    })
}

fn audio_decoder() -> Decoder {
    #[cfg(feature = "ffmpeg-sidecar")]
    {
        Arc::new(chatty_core::decode::FfmpegAudioDecoder::new())
    }
    #[cfg(not(feature = "ffmpeg-sidecar"))]
    {
        Arc::new(chatty_core::decode::WavDecoder::new())
    }
}

fn build_pipeline(cfg: &AppConfig) -> anyhow::Result<(Arc<Chatty>, Option<Capture>)> {
    let decoder = audio_decoder();

    let classifier: Classifier = match &cfg.classifier_command {
        Some(c) => {
            let mut classifier =
                CommandClassifier::new(c.program.clone(), c.args.clone(), cfg.default_emotion);
            if let Some(model) = &cfg.classifier_model {
                classifier = classifier.with_model_path(model.clone());
            }
            Arc::new(classifier)
        }
        None => Arc::new(ProsodyAudioClassifier::new(decoder.clone(), cfg.default_emotion)),
    };

    let responder: Arc<dyn ResponseGenerator> = if cfg.llm.offline {
        Arc::new(CannedResponder::new())
    } else {
        let key = cfg
            .llm
            .api_key
            .clone()
            .with_context(|| format!("{ENV_GEMINI_API_KEY} is required unless --offline is set"))?;
        Arc::new(
            GeminiResponder::new(key, cfg.llm.words)
                .with_model(cfg.llm.model.clone())
                .with_base_url(cfg.llm.base_url.clone()),
        )
    };

    let tts: Arc<dyn TtsBackend> = match &cfg.tts_command {
        Some(c) => Arc::new(CommandTtsBackend::new(c.program.clone(), c.args.clone())),
        None => {
            tracing::warn!("no --tts-command configured, speaking with the built-in tone voice");
            Arc::new(ToneTtsBackend::new())
        }
    };

    let handoff = EmotionHandoff::new();
    let orchestrator = Orchestrator::new(
        DefaultingClassifier::new(classifier.clone(), cfg.default_emotion),
        responder,
        StyledSpeechSynthesizer::new(tts, cfg.output_dir.clone()),
        LipSyncAnimator::from_config(&cfg.animator, cfg.output_dir.clone()),
    )
    .with_handoff(handoff)
    .with_word_range(cfg.llm.words)
    .with_artifact_dir(cfg.output_dir.clone());

    let capture = cfg.transcriber_command.clone().map(|t| {
        AudioCapture::new(
            ClipRecorder::new(decoder.clone()),
            CommandTranscriber::new(t),
            DefaultingClassifier::new(classifier.clone(), cfg.default_emotion),
            cfg.audio_in_dir.clone(),
            cfg.record,
        )
    });

    Ok((Arc::new(orchestrator), capture))
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Say(String),
    Record(PathBuf),
    Replay,
    Quit,
    Blank,
    Unknown(String),
}

fn parse_line(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Blank;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Command::Say(line.to_owned());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match (name, arg) {
        ("quit" | "q", _) => Command::Quit,
        ("replay", _) => Command::Replay,
        ("record", path) if !path.is_empty() => Command::Record(PathBuf::from(path)),
        _ => Command::Unknown(line.to_owned()),
    }
}

async fn run_session(cfg: AppConfig) -> anyhow::Result<()> {
    let (chatty, capture) = build_pipeline(&cfg)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut pending: Option<CapturedInput> = None;
    let mut reporters: Vec<JoinHandle<()>> = Vec::new();

    println!("Type a message, `:record <file>`, `:replay` or `:quit`.");
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        match parse_line(&line) {
            Command::Quit => break,
            Command::Replay => match chatty.last_completed() {
                Some(turn) => print_turn(&turn),
                None => println!("Nothing to replay yet."),
            },
            Command::Record(source) => {
                let Some(capture) = &capture else {
                    println!("Recording needs --transcriber-command.");
                    continue;
                };
                match capture.capture(Some(source), print_progress).await {
                    Ok(input) => {
                        println!();
                        println!("You => {}", input.transcript);
                        println!("(press enter to send it, or type something else)");
                        chatty.handoff().offer(input.emotion);
                        pending = Some(input);
                    }
                    Err(e) => {
                        println!();
                        println!("{e}");
                    }
                }
            }
            Command::Blank => {
                if let Some(input) = pending.take() {
                    let turn = TurnInput::text(input.transcript).with_audio(input.audio_path);
                    reporters.push(submit(&chatty, turn));
                }
            }
            Command::Say(text) => {
                pending = None;
                println!("You => {text}");
                reporters.push(submit(&chatty, TurnInput::text(text)));
            }
            Command::Unknown(raw) => println!("Unknown command: {raw}"),
        }
        reporters.retain(|h| !h.is_finished());
    }

    for handle in reporters {
        let _ = handle.await;
    }
    Ok(())
}

fn submit(chatty: &Arc<Chatty>, input: TurnInput) -> JoinHandle<()> {
    let handle = chatty.run_turn_detached(input);
    tokio::spawn(async move {
        match handle.await {
            Ok(Ok(turn)) => print_turn(&turn),
            Ok(Err(e @ TurnError::Failed { .. })) => {
                println!("{e}");
                if let Some(msg) = e.turn().and_then(Turn::user_message) {
                    println!("Chatty => {msg}");
                }
            }
            Ok(Err(e)) => println!("{e}"),
            Err(e) => tracing::error!(error = %e, "turn task panicked"),
        }
    })
}

fn print_turn(turn: &Turn) {
    if let Some(emotion) = turn.emotion {
        println!("Chatty => You sound {emotion}");
    }
    if let Some(reply) = &turn.reply {
        println!("Chatty => {reply}");
    }
    if let Some(video) = &turn.video {
        println!("Video: {}", video.path.display());
    }
}

fn print_progress(pct: u8) {
    print!("\rRecording... {pct:>3}%");
    let _ = std::io::stdout().flush();
}
