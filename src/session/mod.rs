//! Session orchestration — the turn loop and its collaborators.
//!
//! # Architecture
//!
//! ```text
//! Session::run()
//!   │
//!   ├─ voice mode: Recorder (spawn_blocking) → encode_wav
//!   │                → TranscriptionClient → text
//!   │                └─ failure / no speech → LineReader fallback
//!   ├─ text mode:  LineReader → text
//!   │
//!   ├─ exit phrase / EOF / turn limit / interrupt → cleanup, return
//!   │
//!   └─ ConversationHistory::append_user
//!        → CompletionClient (fragments → stdout)
//!        → commit_assistant → SpeechOutput::speak (voice mode)
//! ```
//!
//! The session owns every mutable resource (history, speech engine); the
//! adapters only see read-only snapshots for the duration of one call.

pub mod input;
pub mod roast;
pub mod runner;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use input::{LineReader, StdinReader};
pub use roast::{roast, Stage};
pub use runner::{EndReason, Session, SessionSummary, TurnResult};
