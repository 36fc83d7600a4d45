//! WAV packaging for the transcription upload.
//!
//! Pure transformation: f32 samples scaled to signed 16-bit and written
//! into an in-memory mono WAV container. Identical input produces
//! bit-identical bytes.

use std::io::Cursor;

use thiserror::Error;

use super::capture::AudioClip;

// ---------------------------------------------------------------------------
// EncodeError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),
}

// ---------------------------------------------------------------------------
// encode_wav
// ---------------------------------------------------------------------------

/// Encode a clip as 16-bit mono PCM WAV bytes.
///
/// Samples are scaled by 32767 and clamped, so out-of-range input saturates
/// instead of wrapping.
pub fn encode_wav(clip: &AudioClip) -> Result<Vec<u8>, EncodeError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
        for &sample in &clip.samples {
            let quantized = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
            writer.write_sample(quantized)?;
        }
        writer.finalize()?;
    }

    Ok(cursor.into_inner())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
