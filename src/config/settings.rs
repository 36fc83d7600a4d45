//! Agent settings resolved once from the environment.
//!
//! [`AgentConfig`] is an immutable value object constructed by
//! [`AgentConfig::from_env`] before the session starts. The core never reads
//! environment variables itself — everything arrives through this struct,
//! already validated and defaulted.

use thiserror::Error;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors that abort configuration loading.
///
/// Malformed numeric values never error — they log a warning and fall back
/// to the default, so a typo in `.env` cannot keep the agent from starting.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("OPENAI_API_KEY is not set — add it to your environment or .env file")]
    MissingApiKey,
}

// ---------------------------------------------------------------------------
// InputMode
// ---------------------------------------------------------------------------

/// How user input is obtained each turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Record from the microphone, transcribe, fall back to text on failure.
    Voice,
    /// Read one line per turn from stdin. No audio, no synthesis.
    Text,
}

// ---------------------------------------------------------------------------
// SynthFailurePolicy
// ---------------------------------------------------------------------------

/// What a speech-synthesis failure does to the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthFailurePolicy {
    /// A failure mutes speech output for the remainder of the session.
    Disable,
    /// A failure affects only that call; the next reply tries again.
    Retry,
}

// ---------------------------------------------------------------------------
// AgentConfig
// ---------------------------------------------------------------------------

/// Resolved configuration for one agent session. Never mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Chat model identifier (e.g. `"gpt-5"`).
    pub chat_model: String,
    /// Transcription model identifier (e.g. `"whisper-1"`).
    pub transcription_model: String,
    /// API root for both services, without a trailing slash.
    pub base_url: String,
    /// Bearer token for both services.
    pub api_key: String,
    /// Capture sample rate in Hz.
    pub sample_rate: u32,
    /// Fixed recording window per voice turn, in seconds.
    pub record_seconds: f32,
    /// Voice or text input.
    pub input_mode: InputMode,
    /// Optional cap on completed exchanges; `None` means unbounded.
    pub max_turns: Option<u32>,
    /// Trimmed, lowercased phrases that end the session on match.
    pub exit_phrases: Vec<String>,
    /// Optional system message seeded into the history.
    pub system_prompt: Option<String>,
    /// Optional synthesis rate on a words-per-minute-like scale.
    pub voice_rate: Option<i32>,
    /// Optional synthesis volume; clamped to `[0.0, 1.0]` at the engine.
    pub voice_volume: Option<f32>,
    /// Scope of a synthesis failure.
    pub synth_failure_policy: SynthFailurePolicy,
    /// Per-request HTTP timeout in seconds (transcription; connect phase of
    /// the streaming chat request).
    pub request_timeout_secs: u64,
}

impl AgentConfig {
    /// Resolve configuration from the process environment, honouring a
    /// `.env` file in the working directory when present.
    ///
    /// # Errors
    ///
    /// Only [`ConfigError::MissingApiKey`]. Everything else defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve from an explicit lookup function (useful for tests, which
    /// must not touch process-global environment state).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("OPENAI_API_KEY")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let chat_model = non_empty(lookup("OPENAI_MODEL"), "gpt-5");
        let transcription_model = non_empty(lookup("OPENAI_TRANSCRIPTION_MODEL"), "whisper-1");
        let base_url = non_empty(lookup("OPENAI_BASE_URL"), "https://api.openai.com")
            .trim_end_matches('/')
            .to_string();

        let sample_rate = parse_or("SAMPLE_RATE", lookup("SAMPLE_RATE"), 16_000);
        let record_seconds = parse_or("RECORD_SECONDS", lookup("RECORD_SECONDS"), 8.0_f32);
        let request_timeout_secs =
            parse_or("REQUEST_TIMEOUT_SECS", lookup("REQUEST_TIMEOUT_SECS"), 30_u64);

        let input_mode = match lookup("TEXT_ONLY").as_deref().map(str::trim) {
            Some("1") => InputMode::Text,
            _ => InputMode::Voice,
        };

        let max_turns = parse_opt("MAX_TURNS", lookup("MAX_TURNS"));
        let voice_rate = parse_opt("VOICE_RATE", lookup("VOICE_RATE"));
        let voice_volume = parse_opt("VOICE_VOLUME", lookup("VOICE_VOLUME"));

        let synth_failure_policy = match lookup("TTS_FAILURE_POLICY").as_deref().map(str::trim) {
            Some("retry") => SynthFailurePolicy::Retry,
            Some("disable") | None => SynthFailurePolicy::Disable,
            Some(other) => {
                log::warn!("Invalid TTS_FAILURE_POLICY '{other}'. Using 'disable'.");
                SynthFailurePolicy::Disable
            }
        };

        let exit_phrases = parse_exit_phrases(lookup("EXIT_PHRASES").as_deref());
        let system_prompt = lookup("SYSTEM_PROMPT").filter(|v| !v.is_empty());

        Ok(Self {
            chat_model,
            transcription_model,
            base_url,
            api_key,
            sample_rate,
            record_seconds,
            input_mode,
            max_turns,
            exit_phrases,
            system_prompt,
            voice_rate,
            voice_volume,
            synth_failure_policy,
            request_timeout_secs,
        })
    }

    /// Whether trimmed input matches a configured exit phrase
    /// (case-insensitive).
    pub fn is_exit_phrase(&self, text: &str) -> bool {
        let normalized = text.trim().to_lowercase();
        self.exit_phrases.iter().any(|p| *p == normalized)
    }
}

// ---------------------------------------------------------------------------
// Parse helpers
// ---------------------------------------------------------------------------

fn non_empty(value: Option<String>, default: &str) -> String {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => v,
        _ => default.to_string(),
    }
}

/// Parse a value, warning and falling back to `default` when malformed.
fn parse_or<T: std::str::FromStr + std::fmt::Display>(
    name: &str,
    value: Option<String>,
    default: T,
) -> T {
    match value {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(parsed) => parsed,
            Err(_) => {
                log::warn!("Invalid {name} value '{raw}'. Using {default}.");
                default
            }
        },
    }
}

/// Parse an optional value, warning and yielding `None` when malformed.
fn parse_opt<T: std::str::FromStr>(name: &str, value: Option<String>) -> Option<T> {
    let raw = value?;
    match raw.trim().parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("Invalid {name} value '{raw}'. Ignoring it.");
            None
        }
    }
}

/// Comma-delimited at the source, trimmed and lowercased here. An empty or
/// all-blank list falls back to the defaults.
fn parse_exit_phrases(raw: Option<&str>) -> Vec<String> {
    let phrases: Vec<String> = raw
        .unwrap_or("exit,quit,bye")
        .split(',')
        .map(|p| p.trim().to_lowercase())
        .filter(|p| !p.is_empty())
        .collect();

    if phrases.is_empty() {
        vec!["exit".into(), "quit".into(), "bye".into()]
    } else {
        phrases
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn missing_api_key_errors() {
        let result = AgentConfig::from_lookup(lookup_from(&[]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn blank_api_key_errors() {
        let result = AgentConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "   ")]));
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn defaults_apply() {
        let config = AgentConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]))
            .expect("config");

        assert_eq!(config.chat_model, "gpt-5");
        assert_eq!(config.transcription_model, "whisper-1");
        assert_eq!(config.base_url, "https://api.openai.com");
        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.record_seconds, 8.0);
        assert_eq!(config.input_mode, InputMode::Voice);
        assert_eq!(config.max_turns, None);
        assert_eq!(config.exit_phrases, vec!["exit", "quit", "bye"]);
        assert!(config.system_prompt.is_none());
        assert_eq!(config.synth_failure_policy, SynthFailurePolicy::Disable);
    }

    #[test]
    fn malformed_numbers_fall_back() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SAMPLE_RATE", "very fast"),
            ("RECORD_SECONDS", "eight"),
            ("MAX_TURNS", "forever"),
            ("VOICE_VOLUME", "loud"),
        ]))
        .expect("config");

        assert_eq!(config.sample_rate, 16_000);
        assert_eq!(config.record_seconds, 8.0);
        assert_eq!(config.max_turns, None);
        assert_eq!(config.voice_volume, None);
    }

    #[test]
    fn text_only_flag_selects_text_mode() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TEXT_ONLY", "1"),
        ]))
        .expect("config");
        assert_eq!(config.input_mode, InputMode::Text);

        let config = AgentConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TEXT_ONLY", "0"),
        ]))
        .expect("config");
        assert_eq!(config.input_mode, InputMode::Voice);
    }

    #[test]
    fn exit_phrases_trimmed_and_lowercased() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("EXIT_PHRASES", " Goodbye , STOP now ,, "),
        ]))
        .expect("config");

        assert_eq!(config.exit_phrases, vec!["goodbye", "stop now"]);
    }

    #[test]
    fn all_blank_exit_phrases_fall_back_to_defaults() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("EXIT_PHRASES", " , ,"),
        ]))
        .expect("config");

        assert_eq!(config.exit_phrases, vec!["exit", "quit", "bye"]);
    }

    #[test]
    fn exit_phrase_matching_is_case_insensitive_on_trimmed_text() {
        let config = AgentConfig::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")]))
            .expect("config");

        assert!(config.is_exit_phrase("exit"));
        assert!(config.is_exit_phrase("  QUIT  "));
        assert!(config.is_exit_phrase("\tByE\n"));
        assert!(!config.is_exit_phrase("exit now"));
        assert!(!config.is_exit_phrase(""));
    }

    #[test]
    fn base_url_trailing_slash_is_stripped() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:11434/"),
        ]))
        .expect("config");

        assert_eq!(config.base_url, "http://localhost:11434");
    }

    #[test]
    fn retry_policy_is_selectable() {
        let config = AgentConfig::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("TTS_FAILURE_POLICY", "retry"),
        ]))
        .expect("config");

        assert_eq!(config.synth_failure_policy, SynthFailurePolicy::Retry);
    }
}
