//! Microphone capture via `cpal`.
//!
//! [`MicRecorder`] records one fixed-duration mono clip per call. The
//! device is opened fresh on every [`record`](Recorder::record) so a
//! microphone that disappears (or appears) mid-session changes the outcome
//! of the next turn only — a capture failure is never fatal to the session.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

// ---------------------------------------------------------------------------
// AudioClip
// ---------------------------------------------------------------------------

/// A single recorded clip: mono `f32` samples in `[-1.0, 1.0]`.
///
/// Length is always exactly `record_seconds × sample_rate` frames — the
/// recorder pads or truncates at the device boundary, so downstream code
/// can rely on the fixed size.
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Mono PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this clip in Hz.
    pub sample_rate: u32,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while opening or running the input stream.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to query input configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("input device does not support {0} Hz f32 capture")]
    UnsupportedRate(u32),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
}

// ---------------------------------------------------------------------------
// Recorder trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface for audio recorders.
///
/// `record` blocks the calling thread for the configured duration — call it
/// through `tokio::task::spawn_blocking` from async code.
pub trait Recorder: Send + Sync {
    fn record(&self) -> Result<AudioClip, CaptureError>;
}

// ---------------------------------------------------------------------------
// MicRecorder
// ---------------------------------------------------------------------------

/// Records from the system default input device.
pub struct MicRecorder {
    sample_rate: u32,
    record_seconds: f32,
}

/// Extra wall-clock allowance for device start-up before giving up on
/// filling the clip.
const CAPTURE_GRACE: Duration = Duration::from_millis(1_000);

/// Poll interval while waiting for the clip to fill.
const CAPTURE_POLL: Duration = Duration::from_millis(25);

impl MicRecorder {
    pub fn new(sample_rate: u32, record_seconds: f32) -> Self {
        Self {
            sample_rate,
            record_seconds,
        }
    }

    /// Number of mono frames one clip must hold.
    fn target_frames(&self) -> usize {
        (self.record_seconds * self.sample_rate as f32).round() as usize
    }
}

impl Recorder for MicRecorder {
    /// Record one clip, blocking for up to `record_seconds` plus a small
    /// device-start grace.
    ///
    /// Picks the supported `f32` input config at the configured rate with
    /// the fewest channels; multi-channel input is averaged down to mono.
    fn record(&self) -> Result<AudioClip, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let mut candidates: Vec<_> = device
            .supported_input_configs()?
            .filter(|c| {
                c.sample_format() == SampleFormat::F32
                    && c.min_sample_rate() <= SampleRate(self.sample_rate)
                    && c.max_sample_rate() >= SampleRate(self.sample_rate)
            })
            .collect();
        candidates.sort_by_key(|c| c.channels());

        let supported = candidates
            .into_iter()
            .next()
            .ok_or(CaptureError::UnsupportedRate(self.sample_rate))?;

        let channels = supported.channels() as usize;
        let config = supported
            .with_sample_rate(SampleRate(self.sample_rate))
            .config();

        let target_frames = self.target_frames();
        let capacity = target_frames * channels;
        let buffer: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::with_capacity(capacity)));

        let writer = Arc::clone(&buffer);
        let stream = device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut buf) = writer.lock() {
                    let room = capacity.saturating_sub(buf.len());
                    buf.extend_from_slice(&data[..data.len().min(room)]);
                }
            },
            |err: cpal::StreamError| {
                log::error!("input stream error: {err}");
            },
            None,
        )?;

        stream.play()?;
        log::info!(
            "Recording for up to {:.1} s at {} Hz.",
            self.record_seconds,
            self.sample_rate
        );

        let deadline =
            Instant::now() + Duration::from_secs_f32(self.record_seconds) + CAPTURE_GRACE;
        loop {
            let filled = buffer.lock().map(|b| b.len()).unwrap_or(capacity);
            if filled >= capacity || Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(CAPTURE_POLL);
        }
        drop(stream);

        let interleaved = buffer.lock().map(|mut b| std::mem::take(&mut *b)).unwrap_or_default();
        let mono = downmix_to_mono(&interleaved, channels);

        Ok(AudioClip {
            samples: fit_to_length(mono, target_frames),
            sample_rate: self.sample_rate,
        })
    }
}

// ---------------------------------------------------------------------------
// Sample helpers
// ---------------------------------------------------------------------------

/// Average interleaved frames down to one channel. Mono input passes
/// through; a trailing partial frame is dropped.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Zero-pad or truncate to exactly `frames` samples.
pub fn fit_to_length(mut samples: Vec<f32>, frames: usize) -> Vec<f32> {
    samples.resize(frames, 0.0);
    samples
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
