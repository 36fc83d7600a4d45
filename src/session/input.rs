//! Line-oriented text input.
//!
//! [`LineReader`] is the seam between the session and stdin: text mode
//! reads every turn through it, and voice mode falls back to it when the
//! microphone path yields nothing usable. End-of-stream is reported as
//! `Ok(None)` — termination, not an error.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

// ---------------------------------------------------------------------------
// LineReader trait
// ---------------------------------------------------------------------------

/// One line of user input per call.
#[async_trait]
pub trait LineReader: Send {
    /// Show `prompt` and read one line (without the trailing newline).
    /// `Ok(None)` means the input stream is closed.
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>>;
}

// ---------------------------------------------------------------------------
// StdinReader
// ---------------------------------------------------------------------------

/// Reads lines from the process stdin.
pub struct StdinReader {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinReader {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineReader for StdinReader {
    async fn read_line(&mut self, prompt: &str) -> std::io::Result<Option<String>> {
        use std::io::Write;

        print!("{prompt}");
        std::io::stdout().flush()?;

        self.lines.next_line().await
    }
}
