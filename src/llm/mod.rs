//! Chat-completion service boundary.
//!
//! * [`CompletionClient`] — async trait implemented by all backends.
//! * [`ChatClient`] — OpenAI-compatible streaming REST client.
//! * [`ReplySink`] — receives fragments for progressive display.
//! * [`CompletionError`] — error variants; an empty reply is its own kind,
//!   distinct from transport failure.

pub mod client;

pub use client::{ChatClient, CompletionClient, CompletionError, ReplySink};
