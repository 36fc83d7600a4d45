//! Speech output — synthesis engine lifecycle and playback.
//!
//! * [`Synthesizer`] — blocking speech engine interface.
//! * [`EngineSynthesizer`] — platform engine implementation.
//! * [`SpeechOutput`] — session-scoped owner: lazy acquisition, failure
//!   policy, explicit release.

pub mod synth;

pub use synth::{EngineSynthesizer, SpeechOutput, SynthError, SynthFactory, Synthesizer};
