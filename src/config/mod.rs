//! Configuration for the voice agent.
//!
//! Provides [`AgentConfig`] (the resolved, immutable session settings),
//! the [`InputMode`] / [`SynthFailurePolicy`] selectors, and environment
//! loading via [`AgentConfig::from_env`].

pub mod settings;

pub use settings::{AgentConfig, ConfigError, InputMode, SynthFailurePolicy};
