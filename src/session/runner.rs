//! Session runner — drives the capture → converse → render turn loop.
//!
//! # Turn flow
//!
//! ```text
//! obtain user text
//!   ├─ voice mode: record → encode → transcribe
//!   │     └─ any failure / no speech → one-line text fallback, same turn
//!   └─ text mode: read one stdin line
//!
//! blank text        → skip (not a turn)
//! exit phrase       → farewell, session ends
//! otherwise         → append_user → streamed completion
//!       ├─ Ok       → commit_assistant, count turn, speak (voice mode)
//!       ├─ empty    → rollback, log, skip silently
//!       └─ failure  → rollback, roast, continue
//! ```
//!
//! No failure inside an iteration ever escapes [`Session::run`]; the only
//! ways out are end-of-input, an exit phrase, the turn limit, and the
//! interrupt signal — each of which releases the speech engine first.

use std::sync::Arc;

use tokio::sync::watch;

use crate::audio::{encode_wav, Recorder};
use crate::config::{AgentConfig, InputMode};
use crate::history::ConversationHistory;
use crate::llm::{CompletionClient, CompletionError, ReplySink};
use crate::speech::SpeechOutput;
use crate::stt::{TranscribeError, TranscriptionClient};

use super::input::LineReader;
use super::roast::{roast, Stage};

// ---------------------------------------------------------------------------
// EndReason / SessionSummary / TurnResult
// ---------------------------------------------------------------------------

/// Why the session loop stopped. These are the only terminal conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// Trimmed input matched a configured exit phrase.
    ExitPhrase,
    /// End-of-stream on the text input.
    InputClosed,
    /// The configured maximum number of exchanges was reached.
    TurnLimit,
    /// External interrupt (Ctrl-C).
    Interrupted,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EndReason::ExitPhrase => write!(f, "exit phrase"),
            EndReason::InputClosed => write!(f, "end of input"),
            EndReason::TurnLimit => write!(f, "turn limit reached"),
            EndReason::Interrupted => write!(f, "interrupted"),
        }
    }
}

/// What one loop iteration produced. Transient — only `run` reads it, to
/// decide whether the loop continues.
#[derive(Debug)]
pub struct TurnResult {
    pub user_text: Option<String>,
    pub assistant_text: Option<String>,
    pub terminated: bool,
    pub reason: Option<EndReason>,
}

impl TurnResult {
    fn skipped(user_text: Option<String>) -> Self {
        Self {
            user_text,
            assistant_text: None,
            terminated: false,
            reason: None,
        }
    }

    fn completed(user_text: String, assistant_text: String) -> Self {
        Self {
            user_text: Some(user_text),
            assistant_text: Some(assistant_text),
            terminated: false,
            reason: None,
        }
    }

    fn ended(user_text: Option<String>, reason: EndReason) -> Self {
        Self {
            user_text,
            assistant_text: None,
            terminated: true,
            reason: Some(reason),
        }
    }
}

/// Final report returned by [`Session::run`].
#[derive(Debug, Clone, Copy)]
pub struct SessionSummary {
    pub turns: u32,
    pub reason: EndReason,
}

// ---------------------------------------------------------------------------
// Input classification
// ---------------------------------------------------------------------------

/// Outcome of obtaining user text for one iteration.
enum Input {
    Text(String),
    /// Read worked but produced nothing to act on this iteration.
    Empty,
    Closed,
    Interrupted,
}

/// Outcome of the voice path alone.
enum VoiceCapture {
    Recognized(String),
    /// Device, encoding, service, or no-speech failure — fall back to text.
    Unusable,
    Interrupted,
}

// ---------------------------------------------------------------------------
// StdoutSink
// ---------------------------------------------------------------------------

/// Prints reply fragments as they stream in.
struct StdoutSink;

impl ReplySink for StdoutSink {
    fn fragment(&mut self, text: &str) {
        use std::io::Write;
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One conversational session: owns the history, the adapters, and the
/// speech resource; runs turns until a terminal condition.
pub struct Session {
    config: AgentConfig,
    history: ConversationHistory,
    recorder: Option<Arc<dyn Recorder>>,
    transcriber: Option<Box<dyn TranscriptionClient>>,
    completion: Box<dyn CompletionClient>,
    speech: SpeechOutput,
    input: Box<dyn LineReader>,
    interrupt: watch::Receiver<bool>,
    turns: u32,
}

impl Session {
    pub fn new(
        config: AgentConfig,
        completion: Box<dyn CompletionClient>,
        input: Box<dyn LineReader>,
        speech: SpeechOutput,
        interrupt: watch::Receiver<bool>,
    ) -> Self {
        let history = ConversationHistory::new(config.system_prompt.as_deref());
        Self {
            config,
            history,
            recorder: None,
            transcriber: None,
            completion,
            speech,
            input,
            interrupt,
            turns: 0,
        }
    }

    /// Attach the voice path (recorder + transcriber). Without it the
    /// session behaves as text-only regardless of the configured mode.
    pub fn with_voice(
        mut self,
        recorder: Arc<dyn Recorder>,
        transcriber: Box<dyn TranscriptionClient>,
    ) -> Self {
        self.recorder = Some(recorder);
        self.transcriber = Some(transcriber);
        self
    }

    /// Context window, for inspection after the run.
    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Run turns until a terminal condition. Never returns an error: every
    /// fault inside an iteration degrades or skips, and all exit paths
    /// release the speech engine before returning.
    pub async fn run(&mut self) -> SessionSummary {
        let phrases = self.config.exit_phrases.join(", ");
        match self.config.input_mode {
            InputMode::Text => {
                log::info!("Text-only mode enabled. Type an exit phrase ({phrases}) to stop.");
            }
            InputMode::Voice => {
                log::info!("Listening... say one of ({phrases}) to stop.");
            }
        }

        let reason = loop {
            if let Some(limit) = self.config.max_turns {
                if self.turns >= limit {
                    break EndReason::TurnLimit;
                }
            }
            if *self.interrupt.borrow() {
                break EndReason::Interrupted;
            }

            let turn = self.run_turn().await;
            if turn.terminated {
                break turn.reason.unwrap_or(EndReason::InputClosed);
            }
        };

        self.speech.shutdown();
        log::info!("Session finished after {} turn(s).", self.turns);

        SessionSummary {
            turns: self.turns,
            reason,
        }
    }

    // -----------------------------------------------------------------------
    // One iteration
    // -----------------------------------------------------------------------

    async fn run_turn(&mut self) -> TurnResult {
        let user_text = match self.obtain_user_text().await {
            Input::Text(text) => text.trim().to_string(),
            Input::Empty => return TurnResult::skipped(None),
            Input::Closed => return TurnResult::ended(None, EndReason::InputClosed),
            Input::Interrupted => return TurnResult::ended(None, EndReason::Interrupted),
        };

        // Blank input is not a turn; it does not count toward the limit.
        if user_text.is_empty() {
            return TurnResult::skipped(None);
        }

        if self.config.is_exit_phrase(&user_text) {
            log::info!("Exit phrase received.");
            println!("Goodbye.");
            return TurnResult::ended(Some(user_text), EndReason::ExitPhrase);
        }

        self.history.append_user(user_text.clone());

        {
            use std::io::Write;
            print!("Assistant: ");
            let _ = std::io::stdout().flush();
        }
        let mut sink = StdoutSink;
        let outcome = self
            .completion
            .complete(self.history.messages(), &mut sink)
            .await;
        println!();

        match outcome {
            Ok(reply) => {
                self.history.commit_assistant(reply.clone());
                self.turns += 1;
                if self.config.input_mode == InputMode::Voice {
                    if let Err(e) = self.speech.speak(&reply).await {
                        log::warn!("Speech synthesis failed: {e}");
                        eprintln!("{}", roast(Stage::Synthesis));
                    }
                }
                TurnResult::completed(user_text, reply)
            }
            Err(CompletionError::EmptyReply) => {
                // Service succeeded but sent nothing — not a transport
                // fault. Skip silently; the staged user message must not
                // stay behind.
                self.history.rollback_pending_user();
                log::info!("Model returned an empty response.");
                TurnResult::skipped(Some(user_text))
            }
            Err(e) => {
                self.history.rollback_pending_user();
                log::warn!("Chat completion failed: {e}");
                eprintln!("{}", roast(Stage::Completion));
                TurnResult::skipped(Some(user_text))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Input acquisition
    // -----------------------------------------------------------------------

    async fn obtain_user_text(&mut self) -> Input {
        match self.config.input_mode {
            InputMode::Text => self.read_text_line("You: ").await,
            InputMode::Voice => match self.capture_voice().await {
                VoiceCapture::Recognized(text) => {
                    println!("You said: {text}");
                    Input::Text(text)
                }
                VoiceCapture::Interrupted => Input::Interrupted,
                // Voice path failed — same turn continues on the keyboard.
                VoiceCapture::Unusable => self.read_text_line("You (typed): ").await,
            },
        }
    }

    /// Record, encode, and transcribe one clip.
    async fn capture_voice(&mut self) -> VoiceCapture {
        let Some(recorder) = self.recorder.clone() else {
            log::warn!("No recorder available; falling back to text input.");
            return VoiceCapture::Unusable;
        };

        let recording = tokio::task::spawn_blocking(move || recorder.record());
        let mut interrupt = self.interrupt.clone();

        let clip = tokio::select! {
            _ = interrupted(&mut interrupt) => return VoiceCapture::Interrupted,
            joined = recording => match joined {
                Ok(Ok(clip)) => clip,
                Ok(Err(e)) => {
                    log::warn!("Microphone capture failed: {e}");
                    eprintln!("{}", roast(Stage::Capture));
                    return VoiceCapture::Unusable;
                }
                Err(e) => {
                    log::warn!("Capture task failed: {e}");
                    eprintln!("{}", roast(Stage::Capture));
                    return VoiceCapture::Unusable;
                }
            },
        };

        let wav = match encode_wav(&clip) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::warn!("Audio encoding failed: {e}");
                eprintln!("{}", roast(Stage::Capture));
                return VoiceCapture::Unusable;
            }
        };

        let Some(transcriber) = &self.transcriber else {
            log::warn!("No transcriber available; falling back to text input.");
            return VoiceCapture::Unusable;
        };

        match transcriber.transcribe(&wav).await {
            Ok(text) => VoiceCapture::Recognized(text),
            Err(TranscribeError::NoSpeech) => {
                // Capture-quality issue, not a service fault — say so
                // plainly instead of roasting the service.
                log::info!("No speech detected in recording.");
                println!("Heard nothing usable.");
                VoiceCapture::Unusable
            }
            Err(e) => {
                log::warn!("Transcription failed: {e}");
                eprintln!("{}", roast(Stage::Transcription));
                VoiceCapture::Unusable
            }
        }
    }

    async fn read_text_line(&mut self, prompt: &str) -> Input {
        let mut interrupt = self.interrupt.clone();
        tokio::select! {
            _ = interrupted(&mut interrupt) => Input::Interrupted,
            line = self.input.read_line(prompt) => match line {
                Ok(Some(text)) => Input::Text(text),
                Ok(None) => {
                    log::info!("Input stream closed.");
                    Input::Closed
                }
                Err(e) => {
                    log::warn!("Failed to read from input: {e}");
                    Input::Empty
                }
            },
        }
    }
}

/// Resolves once the interrupt flag is raised; pends forever otherwise.
async fn interrupted(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|stop| *stop).await.is_err() {
        // Sender dropped without interrupting — never resolve.
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
