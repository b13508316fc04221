mod turn;

use crate::animate::{video_artifact_path, AnimationError, Animator};
use crate::capture::EmotionHandoff;
use crate::config::WordRange;
use crate::emotion::{DefaultingClassifier, EmotionClassifier, EmotionLabel};
use crate::respond::{word_count, ResponseError, ResponseGenerator};
use crate::tts::{audio_artifact_path, SpeechSynthesizer, SynthesisError};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

pub use turn::{EmotionSource, Stage, Turn, TurnInput, TurnState};

const LOG_TARGET: &str = "orchestrator";

#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Generation(#[from] ResponseError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Animation(#[from] AnimationError),
}

impl StageError {
    pub fn stage(&self) -> Stage {
        match self {
            StageError::Generation(_) => Stage::Generation,
            StageError::Synthesis(_) => Stage::Synthesis,
            StageError::Animation(_) => Stage::Animation,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TurnError {
    #[error("nothing to answer: input text is empty")]
    EmptyInput,

    /// The turn consumed its index but stopped at `stage`. `turn` holds
    /// whatever was produced before the failure, minus removed artifacts.
    #[error("turn {} failed at {stage}: {source}", .turn.index)]
    Failed {
        stage: Stage,
        turn: Box<Turn>,
        source: StageError,
    },
}

impl TurnError {
    pub fn turn(&self) -> Option<&Turn> {
        match self {
            TurnError::Failed { turn, .. } => Some(turn),
            TurnError::EmptyInput => None,
        }
    }
}

/// Drives one turn at a time through classify, reply, speak and animate.
///
/// Turns are serialized: a second `run_turn` waits until the one in flight
/// reaches a terminal state. Every accepted turn takes the next index, even
/// when it later fails, so artifact names never repeat within a session.
pub struct Orchestrator<C, R, S, A> {
    classifier: DefaultingClassifier<C>,
    responder: R,
    synthesizer: S,
    animator: A,
    handoff: EmotionHandoff,
    words: WordRange,
    artifact_dir: Option<PathBuf>,
    next_index: AtomicU64,
    in_flight: tokio::sync::Mutex<()>,
    last_completed: std::sync::Mutex<Option<Turn>>,
}

impl<C, R, S, A> Orchestrator<C, R, S, A>
where
    C: EmotionClassifier,
    R: ResponseGenerator,
    S: SpeechSynthesizer,
    A: Animator,
{
    pub fn new(classifier: DefaultingClassifier<C>, responder: R, synthesizer: S, animator: A) -> Self {
        Self {
            classifier,
            responder,
            synthesizer,
            animator,
            handoff: EmotionHandoff::new(),
            words: WordRange::default(),
            artifact_dir: None,
            next_index: AtomicU64::new(0),
            in_flight: tokio::sync::Mutex::new(()),
            last_completed: std::sync::Mutex::new(None),
        }
    }

    /// Share a handoff slot with the audio capture path.
    pub fn with_handoff(mut self, handoff: EmotionHandoff) -> Self {
        self.handoff = handoff;
        self
    }

    pub fn with_word_range(mut self, words: WordRange) -> Self {
        self.words = words;
        self
    }

    /// Directory holding `turn_<n>.wav` and `turn_<n>.mp4`; partial files
    /// there are removed when a turn fails.
    pub fn with_artifact_dir(mut self, dir: PathBuf) -> Self {
        self.artifact_dir = Some(dir);
        self
    }

    pub fn handoff(&self) -> &EmotionHandoff {
        &self.handoff
    }

    /// Index the next accepted turn will get.
    pub fn next_index(&self) -> u64 {
        self.next_index.load(Ordering::SeqCst)
    }

    /// Most recent turn that reached `VideoReady`.
    pub fn last_completed(&self) -> Option<Turn> {
        match self.last_completed.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub async fn run_turn(&self, input: TurnInput) -> Result<Turn, TurnError> {
        let submitted = self.submit(input)?;
        self.execute(submitted).await
    }

    /// Rejects empty input and claims the pending handoff label. Runs before
    /// the turn waits for the one in flight, so a label offered afterwards
    /// belongs to a later submission.
    fn submit(&self, input: TurnInput) -> Result<Submitted, TurnError> {
        let text = input.text.trim();
        if text.is_empty() {
            return Err(TurnError::EmptyInput);
        }
        Ok(Submitted {
            input: TurnInput {
                text: text.to_owned(),
                audio: input.audio,
            },
            handoff: self.handoff.take(),
        })
    }

    async fn execute(&self, submitted: Submitted) -> Result<Turn, TurnError> {
        let _serial = self.in_flight.lock().await;
        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        tracing::info!(target: LOG_TARGET, turn = index, "turn accepted");
        self.drive(Turn::new(index, submitted.input), submitted.handoff).await
    }

    async fn drive(&self, mut turn: Turn, handoff: Option<EmotionLabel>) -> Result<Turn, TurnError> {
        let index = turn.index;

        let (emotion, source) = self.detect_emotion(&turn, handoff).await;
        turn.emotion = Some(emotion);
        turn.emotion_source = Some(source);
        turn.advance(TurnState::EmotionDetected);
        tracing::info!(target: LOG_TARGET, turn = index, %emotion, ?source, "emotion detected");

        let reply = match self.responder.generate(turn.input_text.clone(), emotion).await {
            Ok(reply) if !reply.trim().is_empty() => reply.trim().to_owned(),
            Ok(_) => return Err(self.fail(turn, ResponseError::EmptyResponse.into()).await),
            Err(e) => return Err(self.fail(turn, e.into()).await),
        };
        let words = word_count(&reply);
        if !self.words.contains(words) {
            tracing::warn!(
                target: LOG_TARGET,
                turn = index,
                words,
                min = self.words.min,
                max = self.words.max,
                "reply length outside requested range"
            );
        }
        turn.reply = Some(reply.clone());
        turn.advance(TurnState::ResponseReady);

        let audio = match self.synthesizer.synthesize(reply, emotion, index).await {
            Ok(audio) => audio,
            Err(e) => return Err(self.fail(turn, e.into()).await),
        };
        turn.audio = Some(audio.clone());
        turn.advance(TurnState::AudioReady);

        let video = match self.animator.animate(audio, emotion).await {
            Ok(video) => video,
            Err(e) => return Err(self.fail(turn, e.into()).await),
        };
        tracing::info!(target: LOG_TARGET, turn = index, path = %video.path.display(), "turn complete");
        turn.video = Some(video);
        turn.advance(TurnState::VideoReady);

        match self.last_completed.lock() {
            Ok(mut g) => *g = Some(turn.clone()),
            Err(poisoned) => *poisoned.into_inner() = Some(turn.clone()),
        }
        Ok(turn)
    }

    async fn detect_emotion(&self, turn: &Turn, handoff: Option<EmotionLabel>) -> (EmotionLabel, EmotionSource) {
        if let Some(emotion) = handoff {
            return (emotion, EmotionSource::Handoff);
        }
        match &turn.input_audio {
            Some(path) => (
                self.classifier.audio_or_default(path.clone()).await,
                EmotionSource::Audio,
            ),
            None => (
                self.classifier.text_or_default(turn.input_text.clone()).await,
                EmotionSource::Text,
            ),
        }
    }

    async fn fail(&self, mut turn: Turn, source: StageError) -> TurnError {
        let stage = source.stage();
        tracing::error!(target: LOG_TARGET, turn = turn.index, %stage, error = %source, "turn failed");

        let mut doomed: Vec<PathBuf> = Vec::new();
        if let Some(audio) = turn.audio.take() {
            doomed.push(audio.path);
        }
        if let Some(video) = turn.video.take() {
            doomed.push(video.path);
        }
        if let Some(dir) = &self.artifact_dir {
            doomed.push(audio_artifact_path(dir, turn.index));
            doomed.push(video_artifact_path(dir, turn.index));
        }
        for path in &doomed {
            remove_artifact(path).await;
        }

        turn.failure = Some(source.to_string());
        turn.advance(TurnState::Failed(stage));
        TurnError::Failed {
            stage,
            turn: Box::new(turn),
            source,
        }
    }
}

impl<C, R, S, A> Orchestrator<C, R, S, A>
where
    C: EmotionClassifier + 'static,
    R: ResponseGenerator + 'static,
    S: SpeechSynthesizer + 'static,
    A: Animator + 'static,
{
    /// Runs the turn on its own task so the caller can keep reading input.
    /// Queued turns still execute one after another.
    pub fn run_turn_detached(self: &Arc<Self>, input: TurnInput) -> JoinHandle<Result<Turn, TurnError>> {
        let submitted = self.submit(input);
        let this = Arc::clone(self);
        tokio::spawn(async move { this.execute(submitted?).await })
    }
}

struct Submitted {
    input: TurnInput,
    handoff: Option<EmotionLabel>,
}

async fn remove_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(target: LOG_TARGET, path = %path.display(), "removed partial artifact"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(
            target: LOG_TARGET,
            path = %path.display(),
            error = %e,
            "could not remove partial artifact"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animate::VideoArtifact;
    use crate::emotion::{EmotionError, KeywordTextClassifier};
    use crate::respond::CannedResponder;
    use crate::tts::{AudioArtifact, StyledSpeechSynthesizer, ToneTtsBackend};
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct ScriptedResponder {
        replies: Mutex<VecDeque<Result<String, ResponseError>>>,
        seen: Mutex<Vec<(String, EmotionLabel)>>,
    }

    impl ScriptedResponder {
        fn with(replies: Vec<Result<String, ResponseError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::default(),
            })
        }

        fn emotions(&self) -> Vec<EmotionLabel> {
            self.seen.lock().unwrap().iter().map(|(_, e)| *e).collect()
        }
    }

    impl ResponseGenerator for ScriptedResponder {
        fn generate(
            &self,
            prompt: String,
            emotion: EmotionLabel,
        ) -> BoxFuture<'_, Result<String, ResponseError>> {
            async move {
                self.seen.lock().unwrap().push((prompt, emotion));
                self.replies
                    .lock()
                    .unwrap()
                    .pop_front()
                    .unwrap_or_else(|| Ok("That sounds hard, I am here to listen whenever you need me.".to_owned()))
            }
            .boxed()
        }
    }

    /// Writes a placeholder `turn_<n>.wav`; optionally fails after writing.
    struct FileSynth {
        dir: PathBuf,
        fail: bool,
        calls: AtomicUsize,
    }

    impl FileSynth {
        fn new(dir: &Path, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                dir: dir.to_path_buf(),
                fail,
                calls: AtomicUsize::new(0),
            })
        }
    }

    impl SpeechSynthesizer for FileSynth {
        fn synthesize(
            &self,
            _text: String,
            _emotion: EmotionLabel,
            sequence: u64,
        ) -> BoxFuture<'_, Result<AudioArtifact, SynthesisError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let path = audio_artifact_path(&self.dir, sequence);
                tokio::fs::write(&path, b"RIFF").await.unwrap();
                if self.fail {
                    return Err(SynthesisError::Backend("model crashed".into()));
                }
                Ok(AudioArtifact {
                    sequence,
                    path,
                    sample_rate_hz: 22_050,
                    sample_count: 22_050,
                })
            }
            .boxed()
        }
    }

    struct FileAnimator {
        dir: PathBuf,
        fail: bool,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl FileAnimator {
        fn new(dir: &Path, fail: bool) -> Arc<Self> {
            Arc::new(Self {
                dir: dir.to_path_buf(),
                fail,
                calls: AtomicUsize::new(0),
                delay: Duration::ZERO,
            })
        }
    }

    impl Animator for FileAnimator {
        fn animate(
            &self,
            audio: AudioArtifact,
            _emotion: EmotionLabel,
        ) -> BoxFuture<'_, Result<VideoArtifact, AnimationError>> {
            async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(self.delay).await;
                let path = video_artifact_path(&self.dir, audio.sequence);
                tokio::fs::write(&path, b"mp4").await.unwrap();
                if self.fail {
                    return Err(AnimationError::Timeout(Duration::from_secs(300)));
                }
                Ok(VideoArtifact {
                    sequence: audio.sequence,
                    path,
                })
            }
            .boxed()
        }
    }

    struct BrokenClassifier;

    impl EmotionClassifier for BrokenClassifier {
        fn classify_text(&self, _text: String) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
            async { Err(EmotionError::Inference("model missing".into())) }.boxed()
        }

        fn classify_audio(&self, _path: PathBuf) -> BoxFuture<'_, Result<EmotionLabel, EmotionError>> {
            async { Err(EmotionError::Inference("model missing".into())) }.boxed()
        }
    }

    fn keyword() -> DefaultingClassifier<KeywordTextClassifier> {
        DefaultingClassifier::new(KeywordTextClassifier::default(), EmotionLabel::Neutral)
    }

    #[tokio::test]
    async fn sad_turn_reaches_video_ready_with_real_synthesis() {
        let dir = tempfile::tempdir().unwrap();
        let animator = FileAnimator::new(dir.path(), false);
        let orch = Orchestrator::new(
            keyword(),
            CannedResponder::new(),
            StyledSpeechSynthesizer::new(ToneTtsBackend::new(), dir.path().to_path_buf()),
            animator.clone(),
        );

        let turn = orch.run_turn(TurnInput::text("I lost my keys")).await.unwrap();

        assert_eq!(turn.index, 0);
        assert_eq!(turn.emotion, Some(EmotionLabel::Sad));
        assert_eq!(turn.emotion_source, Some(EmotionSource::Text));
        assert!(!turn.reply.as_deref().unwrap_or_default().is_empty());
        let audio = turn.audio.as_ref().unwrap();
        assert_eq!(audio.path, dir.path().join("turn_0.wav"));
        assert!(audio.path.exists());
        assert_eq!(turn.video.as_ref().unwrap().path, dir.path().join("turn_0.mp4"));
        assert_eq!(
            turn.history,
            vec![
                TurnState::Idle,
                TurnState::EmotionDetected,
                TurnState::ResponseReady,
                TurnState::AudioReady,
                TurnState::VideoReady,
            ]
        );
        assert_eq!(orch.last_completed(), Some(turn));
        assert_eq!(orch.next_index(), 1);
    }

    #[tokio::test]
    async fn unavailable_model_stops_at_generation_and_consumes_index() {
        let dir = tempfile::tempdir().unwrap();
        let synth = FileSynth::new(dir.path(), false);
        let animator = FileAnimator::new(dir.path(), false);
        let responder = ScriptedResponder::with(vec![Err(ResponseError::UpstreamUnavailable(
            "503".into(),
        ))]);
        let orch = Orchestrator::new(keyword(), responder, synth.clone(), animator.clone());

        let err = orch.run_turn(TurnInput::text("hello there")).await.unwrap_err();
        let TurnError::Failed { stage, turn, .. } = &err else {
            panic!("expected a failed turn, got {err:?}");
        };
        assert_eq!(*stage, Stage::Generation);
        assert_eq!(turn.state, TurnState::Failed(Stage::Generation));
        assert!(turn.reply.is_none());
        assert!(turn.user_message().unwrap().contains("try again"));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
        assert_eq!(animator.calls.load(Ordering::SeqCst), 0);
        assert_eq!(orch.last_completed(), None);

        let next = orch.run_turn(TurnInput::text("hello again")).await.unwrap();
        assert_eq!(next.index, 1);
        assert!(dir.path().join("turn_1.wav").exists());
        assert!(!dir.path().join("turn_0.wav").exists());
    }

    #[tokio::test]
    async fn blank_reply_is_a_generation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let synth = FileSynth::new(dir.path(), false);
        let responder = ScriptedResponder::with(vec![Ok("   ".into())]);
        let orch = Orchestrator::new(keyword(), responder, synth.clone(), FileAnimator::new(dir.path(), false));

        let err = orch.run_turn(TurnInput::text("hi")).await.unwrap_err();
        assert!(matches!(
            err,
            TurnError::Failed {
                stage: Stage::Generation,
                source: StageError::Generation(ResponseError::EmptyResponse),
                ..
            }
        ));
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_input_is_rejected_without_taking_an_index() {
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(
            keyword(),
            ScriptedResponder::with(vec![]),
            FileSynth::new(dir.path(), false),
            FileAnimator::new(dir.path(), false),
        );
        orch.handoff().offer(EmotionLabel::Angry);

        assert!(matches!(orch.run_turn(TurnInput::text("  \n")).await, Err(TurnError::EmptyInput)));
        assert_eq!(orch.next_index(), 0);
        assert_eq!(orch.handoff().peek(), Some(EmotionLabel::Angry));
    }

    #[tokio::test]
    async fn handoff_overrides_classification_once() {
        let dir = tempfile::tempdir().unwrap();
        let responder = ScriptedResponder::with(vec![]);
        let orch = Orchestrator::new(
            keyword(),
            responder.clone(),
            FileSynth::new(dir.path(), false),
            FileAnimator::new(dir.path(), false),
        );

        orch.handoff().offer(EmotionLabel::Surprise);
        let first = orch.run_turn(TurnInput::text("I lost my keys")).await.unwrap();
        let second = orch.run_turn(TurnInput::text("I lost my keys")).await.unwrap();

        assert_eq!(first.emotion_source, Some(EmotionSource::Handoff));
        assert_eq!(second.emotion_source, Some(EmotionSource::Text));
        assert_eq!(responder.emotions(), vec![EmotionLabel::Surprise, EmotionLabel::Sad]);
    }

    #[tokio::test]
    async fn classifier_failure_uses_default_label() {
        let dir = tempfile::tempdir().unwrap();
        let responder = ScriptedResponder::with(vec![]);
        let orch = Orchestrator::new(
            DefaultingClassifier::new(BrokenClassifier, EmotionLabel::Love),
            responder.clone(),
            FileSynth::new(dir.path(), false),
            FileAnimator::new(dir.path(), false),
        );

        let turn = orch
            .run_turn(TurnInput::text("hi").with_audio(dir.path().join("missing.wav")))
            .await
            .unwrap();
        assert_eq!(turn.emotion, Some(EmotionLabel::Love));
        assert_eq!(turn.emotion_source, Some(EmotionSource::Audio));
        assert_eq!(responder.emotions(), vec![EmotionLabel::Love]);
    }

    #[tokio::test]
    async fn synthesis_failure_leaves_no_audio_behind() {
        let dir = tempfile::tempdir().unwrap();
        let animator = FileAnimator::new(dir.path(), false);
        let orch = Orchestrator::new(
            keyword(),
            ScriptedResponder::with(vec![]),
            FileSynth::new(dir.path(), true),
            animator.clone(),
        )
        .with_artifact_dir(dir.path().to_path_buf());

        let err = orch.run_turn(TurnInput::text("hi")).await.unwrap_err();
        let turn = err.turn().unwrap();
        assert_eq!(turn.state, TurnState::Failed(Stage::Synthesis));
        assert!(turn.reply.is_some());
        assert!(turn.audio.is_none());
        assert!(!dir.path().join("turn_0.wav").exists());
        assert_eq!(animator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn animation_failure_removes_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let orch = Orchestrator::new(
            keyword(),
            ScriptedResponder::with(vec![]),
            FileSynth::new(dir.path(), false),
            FileAnimator::new(dir.path(), true),
        )
        .with_artifact_dir(dir.path().to_path_buf());

        let err = orch.run_turn(TurnInput::text("hi")).await.unwrap_err();
        assert!(err.to_string().starts_with("turn 0 failed at animation"));
        let turn = err.turn().unwrap();
        assert_eq!(turn.state, TurnState::Failed(Stage::Animation));
        assert!(turn.audio.is_none() && turn.video.is_none());
        assert!(!dir.path().join("turn_0.wav").exists());
        assert!(!dir.path().join("turn_0.mp4").exists());
    }

    #[tokio::test]
    async fn indices_increase_across_failed_turns() {
        let dir = tempfile::tempdir().unwrap();
        let responder = ScriptedResponder::with(vec![
            Ok("First reply with enough words to be reasonable here.".into()),
            Err(ResponseError::Api("bad request".into())),
            Ok("Third reply with enough words to be reasonable here.".into()),
        ]);
        let orch = Orchestrator::new(
            keyword(),
            responder,
            FileSynth::new(dir.path(), false),
            FileAnimator::new(dir.path(), false),
        );

        let mut seen = Vec::new();
        for text in ["one", "two", "three"] {
            match orch.run_turn(TurnInput::text(text)).await {
                Ok(t) => seen.push(t.index),
                Err(e) => seen.push(e.turn().unwrap().index),
            }
        }
        assert_eq!(seen, vec![0, 1, 2]);
        assert_eq!(orch.last_completed().unwrap().index, 2);
    }

    #[tokio::test]
    async fn detached_turns_run_one_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let animator = Arc::new(FileAnimator {
            dir: dir.path().to_path_buf(),
            fail: false,
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(20),
        });
        let orch = Arc::new(Orchestrator::new(
            keyword(),
            ScriptedResponder::with(vec![]),
            FileSynth::new(dir.path(), false),
            animator,
        ));

        let a = orch.run_turn_detached(TurnInput::text("first"));
        let b = orch.run_turn_detached(TurnInput::text("second"));
        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();

        let mut indices = vec![a.index, b.index];
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1]);
        assert!(a.is_complete() && b.is_complete());
        assert_eq!(orch.next_index(), 2);
    }

    #[tokio::test]
    async fn label_offered_after_submission_goes_to_the_next_turn() {
        let dir = tempfile::tempdir().unwrap();
        let animator = Arc::new(FileAnimator {
            dir: dir.path().to_path_buf(),
            fail: false,
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(20),
        });
        let orch = Arc::new(Orchestrator::new(
            keyword(),
            ScriptedResponder::with(vec![]),
            FileSynth::new(dir.path(), false),
            animator,
        ));

        let in_flight = orch.run_turn_detached(TurnInput::text("first"));
        let queued = orch.run_turn_detached(TurnInput::text("I lost my keys"));
        orch.handoff().offer(EmotionLabel::Angry);
        let recorded = orch.run_turn_detached(TurnInput::text("here is what I said"));

        in_flight.await.unwrap().unwrap();
        let queued = queued.await.unwrap().unwrap();
        let recorded = recorded.await.unwrap().unwrap();

        assert_eq!(queued.emotion, Some(EmotionLabel::Sad));
        assert_eq!(queued.emotion_source, Some(EmotionSource::Text));
        assert_eq!(recorded.emotion, Some(EmotionLabel::Angry));
        assert_eq!(recorded.emotion_source, Some(EmotionSource::Handoff));
        assert_eq!(orch.handoff().peek(), None);
    }

    #[tokio::test]
    async fn detached_empty_input_leaves_handoff_pending() {
        let dir = tempfile::tempdir().unwrap();
        let orch = Arc::new(Orchestrator::new(
            keyword(),
            ScriptedResponder::with(vec![]),
            FileSynth::new(dir.path(), false),
            FileAnimator::new(dir.path(), false),
        ));
        orch.handoff().offer(EmotionLabel::Fear);

        let res = orch.run_turn_detached(TurnInput::text(" ")).await.unwrap();
        assert!(matches!(res, Err(TurnError::EmptyInput)));
        assert_eq!(orch.handoff().peek(), Some(EmotionLabel::Fear));
        assert_eq!(orch.next_index(), 0);
    }
}
