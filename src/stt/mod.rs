//! Speech-to-text service boundary.
//!
//! * [`TranscriptionClient`] — async trait implemented by all backends.
//! * [`WhisperHttpClient`] — OpenAI-compatible REST transcriber.
//! * [`TranscribeError`] — error variants, with "no speech" kept distinct
//!   from transport faults.

pub mod client;

pub use client::{TranscribeError, TranscriptionClient, WhisperHttpClient};
