//! Audio input — microphone capture and PCM packaging.
//!
//! ```text
//! Microphone → MicRecorder::record → AudioClip (mono f32, fixed length)
//!            → encode_wav → WAV bytes → transcription upload
//! ```
//!
//! The clip is consumed and discarded within the same turn; nothing here
//! persists audio.

pub mod capture;
pub mod encode;

pub use capture::{downmix_to_mono, fit_to_length, AudioClip, CaptureError, MicRecorder, Recorder};
pub use encode::{encode_wav, EncodeError};
