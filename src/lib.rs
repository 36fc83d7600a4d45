//! Voice Agent — a turn-based conversational loop.
//!
//! Each turn captures user input (microphone or stdin), obtains a streamed
//! reply from a chat-completion service, and renders it (speech or text).
//! The interesting part is the degradation policy: any failure on the voice
//! path falls back to typed input within the same turn, a failed completion
//! rolls the pending user message back out of the context window, and a
//! broken speech engine never takes the loop down with it.
//!
//! # Module map
//!
//! * [`config`]  — environment-resolved [`config::AgentConfig`].
//! * [`history`] — the context window with commit/rollback semantics.
//! * [`audio`]   — microphone capture and WAV packaging.
//! * [`stt`]     — transcription service adapter.
//! * [`llm`]     — streaming chat-completion adapter.
//! * [`speech`]  — synthesis engine lifecycle and playback.
//! * [`session`] — the turn loop tying it all together.

pub mod audio;
pub mod config;
pub mod history;
pub mod llm;
pub mod session;
pub mod speech;
pub mod stt;
