//! Speech synthesis — platform TTS engine behind a session-scoped resource.
//!
//! [`EngineSynthesizer`] wraps the platform speech engine. [`SpeechOutput`]
//! owns it for the session: construction is lazy (first spoken reply), text
//! mode never constructs it, and [`shutdown`](SpeechOutput::shutdown) runs
//! on every session exit path. A playback failure never aborts the turn
//! loop; [`SynthFailurePolicy`] decides whether it mutes the rest of the
//! session or only that call.

use std::time::{Duration, Instant};

use thiserror::Error;

use crate::config::SynthFailurePolicy;

// ---------------------------------------------------------------------------
// SynthError
// ---------------------------------------------------------------------------

/// Errors that can occur while initialising or driving the speech engine.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("speech engine initialisation failed: {0}")]
    Init(String),

    #[error("speech playback failed: {0}")]
    Playback(String),
}

// ---------------------------------------------------------------------------
// Synthesizer trait
// ---------------------------------------------------------------------------

/// Object-safe interface for speech engines.
///
/// `speak` blocks until playback completes — call it through
/// `tokio::task::spawn_blocking` from async code.
pub trait Synthesizer: Send {
    fn speak(&mut self, text: &str) -> Result<(), SynthError>;
}

// ---------------------------------------------------------------------------
// EngineSynthesizer
// ---------------------------------------------------------------------------

/// Words-per-minute value mapped onto the engine's normal rate. A
/// configured rate of 200 keeps the platform default; 100 halves it.
const REFERENCE_WPM: f32 = 200.0;

/// Poll interval while waiting for playback to finish.
const SPEAK_POLL: Duration = Duration::from_millis(50);

/// Production synthesizer over the platform engine (`tts` crate).
///
/// Rate and volume are applied once at construction, per the session
/// config; they are never changed afterwards.
pub struct EngineSynthesizer {
    engine: tts::Tts,
}

impl EngineSynthesizer {
    pub fn new(rate: Option<i32>, volume: Option<f32>) -> Result<Self, SynthError> {
        let mut engine = tts::Tts::default().map_err(|e| SynthError::Init(e.to_string()))?;

        if let Some(wpm) = rate {
            let scaled = engine.normal_rate() * (wpm as f32 / REFERENCE_WPM);
            let clamped = scaled.clamp(engine.min_rate(), engine.max_rate());
            engine
                .set_rate(clamped)
                .map_err(|e| SynthError::Init(e.to_string()))?;
        }

        if let Some(volume) = volume {
            let fraction = volume.clamp(0.0, 1.0);
            let scaled = engine.min_volume()
                + fraction * (engine.max_volume() - engine.min_volume());
            engine
                .set_volume(scaled)
                .map_err(|e| SynthError::Init(e.to_string()))?;
        }

        Ok(Self { engine })
    }
}

impl Synthesizer for EngineSynthesizer {
    fn speak(&mut self, text: &str) -> Result<(), SynthError> {
        if text.is_empty() {
            return Ok(());
        }

        let _utterance = self
            .engine
            .speak(text, false)
            .map_err(|e| SynthError::Playback(e.to_string()))?;

        // Give the engine a moment to start, then poll until playback ends.
        // The deadline scales with text length so a wedged backend cannot
        // hang the turn forever.
        std::thread::sleep(Duration::from_millis(100));
        let deadline = Instant::now() + speak_deadline(text);
        while let Ok(true) = self.engine.is_speaking() {
            if Instant::now() >= deadline {
                return Err(SynthError::Playback("playback deadline exceeded".into()));
            }
            std::thread::sleep(SPEAK_POLL);
        }

        Ok(())
    }
}

/// Upper bound on playback time: generous against slow speech rates.
fn speak_deadline(text: &str) -> Duration {
    Duration::from_secs(5 + text.len() as u64 / 5)
}

// ---------------------------------------------------------------------------
// SpeechOutput
// ---------------------------------------------------------------------------

/// Builds a synthesizer on demand.
pub type SynthFactory = Box<dyn Fn() -> Result<Box<dyn Synthesizer>, SynthError> + Send>;

enum EngineState {
    /// Not constructed yet — built lazily on the first spoken reply.
    Idle,
    Ready(Box<dyn Synthesizer>),
    /// Muted: text mode, a `Disable`-policy failure, or shutdown.
    Disabled,
}

/// Session-owned speech output.
///
/// Replaces a process-global engine handle with a resource whose lifetime
/// is the session's: acquired lazily, released explicitly, with failure
/// handling as a visible state transition.
pub struct SpeechOutput {
    state: EngineState,
    policy: SynthFailurePolicy,
    factory: SynthFactory,
}

impl SpeechOutput {
    /// Speech output that will lazily build the platform engine with the
    /// given rate/volume on first use.
    pub fn with_engine(
        policy: SynthFailurePolicy,
        rate: Option<i32>,
        volume: Option<f32>,
    ) -> Self {
        Self::new(
            policy,
            Box::new(move || {
                EngineSynthesizer::new(rate, volume)
                    .map(|engine| Box::new(engine) as Box<dyn Synthesizer>)
            }),
        )
    }

    /// Speech output with a custom factory (tests inject mocks here).
    pub fn new(policy: SynthFailurePolicy, factory: SynthFactory) -> Self {
        Self {
            state: EngineState::Idle,
            policy,
            factory,
        }
    }

    /// Permanently muted output for text mode — no engine is ever built.
    pub fn muted() -> Self {
        Self {
            state: EngineState::Disabled,
            policy: SynthFailurePolicy::Disable,
            factory: Box::new(|| Err(SynthError::Init("speech output is muted".into()))),
        }
    }

    /// Whether a future `speak` call could produce audio.
    pub fn is_enabled(&self) -> bool {
        !matches!(self.state, EngineState::Disabled)
    }

    /// Speak `text`, blocking (off the async threads) until playback ends.
    ///
    /// Muted output returns `Ok` silently. On failure the configured policy
    /// is applied first, then the error is returned so the caller can
    /// surface one diagnostic; the loop itself is never aborted by this.
    pub async fn speak(&mut self, text: &str) -> Result<(), SynthError> {
        if text.is_empty() {
            return Ok(());
        }

        let mut engine = match std::mem::replace(&mut self.state, EngineState::Idle) {
            EngineState::Disabled => {
                self.state = EngineState::Disabled;
                return Ok(());
            }
            EngineState::Ready(engine) => engine,
            EngineState::Idle => match (self.factory)() {
                Ok(engine) => engine,
                Err(e) => {
                    self.apply_policy_on_failure(None);
                    return Err(e);
                }
            },
        };

        let text = text.to_string();
        let joined = tokio::task::spawn_blocking(move || {
            let result = engine.speak(&text);
            (engine, result)
        })
        .await;

        match joined {
            Ok((engine, Ok(()))) => {
                self.state = EngineState::Ready(engine);
                Ok(())
            }
            Ok((engine, Err(e))) => {
                self.apply_policy_on_failure(Some(engine));
                Err(e)
            }
            Err(e) => {
                // The speaking task died; the engine is gone with it.
                self.state = EngineState::Disabled;
                Err(SynthError::Playback(format!("speech task failed: {e}")))
            }
        }
    }

    fn apply_policy_on_failure(&mut self, engine: Option<Box<dyn Synthesizer>>) {
        match (self.policy, engine) {
            (SynthFailurePolicy::Disable, _) => {
                log::warn!("Speech output disabled for the rest of the session.");
                self.state = EngineState::Disabled;
            }
            (SynthFailurePolicy::Retry, Some(engine)) => self.state = EngineState::Ready(engine),
            (SynthFailurePolicy::Retry, None) => self.state = EngineState::Idle,
        }
    }

    /// Release the engine. Idempotent; called on every session exit path.
    pub fn shutdown(&mut self) {
        if matches!(self.state, EngineState::Ready(_)) {
            log::debug!("Releasing speech engine.");
        }
        self.state = EngineState::Disabled;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedSynth {
        fail: bool,
        spoken: Arc<AtomicUsize>,
    }

    impl Synthesizer for ScriptedSynth {
        fn speak(&mut self, _text: &str) -> Result<(), SynthError> {
            if self.fail {
                Err(SynthError::Playback("no audio device".into()))
            } else {
                self.spoken.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    fn counting_factory(
        fail: bool,
        built: Arc<AtomicUsize>,
        spoken: Arc<AtomicUsize>,
    ) -> SynthFactory {
        Box::new(move || {
            built.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedSynth {
                fail,
                spoken: Arc::clone(&spoken),
            }))
        })
    }

    #[tokio::test]
    async fn engine_is_built_lazily_and_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let spoken = Arc::new(AtomicUsize::new(0));
        let mut output = SpeechOutput::new(
            SynthFailurePolicy::Disable,
            counting_factory(false, Arc::clone(&built), Arc::clone(&spoken)),
        );

        assert_eq!(built.load(Ordering::SeqCst), 0);

        output.speak("one").await.expect("speak");
        output.speak("two").await.expect("speak");

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert_eq!(spoken.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn muted_output_never_builds_an_engine() {
        let mut output = SpeechOutput::muted();
        assert!(!output.is_enabled());
        output.speak("ignored").await.expect("muted speak is ok");
    }

    #[tokio::test]
    async fn disable_policy_mutes_after_first_failure() {
        let built = Arc::new(AtomicUsize::new(0));
        let spoken = Arc::new(AtomicUsize::new(0));
        let mut output = SpeechOutput::new(
            SynthFailurePolicy::Disable,
            counting_factory(true, Arc::clone(&built), Arc::clone(&spoken)),
        );

        assert!(output.speak("first").await.is_err());
        assert!(!output.is_enabled());

        // Further calls are silent no-ops; the factory never runs again.
        output.speak("second").await.expect("muted speak is ok");
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_policy_keeps_the_engine_alive() {
        let built = Arc::new(AtomicUsize::new(0));
        let spoken = Arc::new(AtomicUsize::new(0));
        let mut output = SpeechOutput::new(
            SynthFailurePolicy::Retry,
            counting_factory(true, Arc::clone(&built), Arc::clone(&spoken)),
        );

        assert!(output.speak("first").await.is_err());
        assert!(output.is_enabled());
        assert!(output.speak("second").await.is_err());

        // One engine, retried in place — not rebuilt per call.
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retry_policy_retries_a_failed_init() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let attempts_clone = Arc::clone(&attempts);
        let factory: SynthFactory = Box::new(move || {
            attempts_clone.fetch_add(1, Ordering::SeqCst);
            Err(SynthError::Init("engine unavailable".into()))
        });

        let mut output = SpeechOutput::new(SynthFailurePolicy::Retry, factory);
        assert!(output.speak("a").await.is_err());
        assert!(output.speak("b").await.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn shutdown_is_idempotent_and_mutes() {
        let built = Arc::new(AtomicUsize::new(0));
        let spoken = Arc::new(AtomicUsize::new(0));
        let mut output = SpeechOutput::new(
            SynthFailurePolicy::Disable,
            counting_factory(false, Arc::clone(&built), Arc::clone(&spoken)),
        );

        output.speak("hello").await.expect("speak");
        output.shutdown();
        output.shutdown();

        assert!(!output.is_enabled());
        output.speak("after shutdown").await.expect("muted speak");
        assert_eq!(spoken.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_text_is_a_noop() {
        let built = Arc::new(AtomicUsize::new(0));
        let spoken = Arc::new(AtomicUsize::new(0));
        let mut output = SpeechOutput::new(
            SynthFailurePolicy::Disable,
            counting_factory(false, Arc::clone(&built), Arc::clone(&spoken)),
        );

        output.speak("").await.expect("noop");
        assert_eq!(built.load(Ordering::SeqCst), 0);
    }
}
