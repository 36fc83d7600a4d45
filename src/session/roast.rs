//! Cosmetic failure diagnostics.
//!
//! When a stage of the turn fails, the user gets one human-readable line —
//! a roast — instead of a stack trace. The wording is picked at random per
//! stage and carries no control-flow meaning whatsoever; the typed error
//! that caused it has already been logged by the time a roast is shown.

use rand::seq::SliceRandom;

/// The turn stage a roast is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Capture,
    Transcription,
    Completion,
    Synthesis,
}

const CAPTURE_ROASTS: &[&str] = &[
    "The microphone has chosen silence. Type it instead:",
    "Your mic just ghosted us. Keyboard time:",
    "No audio in sight — the mic is on a break. Type away:",
];

const TRANSCRIPTION_ROASTS: &[&str] = &[
    "The transcriber fumbled that one. Give me the text version:",
    "Speech-to-text tapped out mid-sentence. Type it instead:",
    "That audio defeated the transcription service. Keyboard, please:",
];

const COMPLETION_ROASTS: &[&str] = &[
    "The model left us on read. Let's try that turn again.",
    "The completion service dropped the call. Say it once more.",
    "No reply made it through — the model owes you one. Go again.",
];

const SYNTHESIS_ROASTS: &[&str] = &[
    "The speakers refuse to perform today. You'll have to read this one.",
    "Text-to-speech lost its voice. The reply is on screen.",
    "Playback bailed — silent movie mode it is.",
];

/// One roast for the failed stage, chosen at random.
pub fn roast(stage: Stage) -> &'static str {
    let pool = match stage {
        Stage::Capture => CAPTURE_ROASTS,
        Stage::Transcription => TRANSCRIPTION_ROASTS,
        Stage::Completion => COMPLETION_ROASTS,
        Stage::Synthesis => SYNTHESIS_ROASTS,
    };
    pool.choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or("Something went sideways. Carrying on.")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_has_a_line() {
        for stage in [
            Stage::Capture,
            Stage::Transcription,
            Stage::Completion,
            Stage::Synthesis,
        ] {
            assert!(!roast(stage).is_empty());
        }
    }

    #[test]
    fn roast_comes_from_the_stage_pool() {
        for _ in 0..32 {
            assert!(CAPTURE_ROASTS.contains(&roast(Stage::Capture)));
            assert!(SYNTHESIS_ROASTS.contains(&roast(Stage::Synthesis)));
        }
    }
}
