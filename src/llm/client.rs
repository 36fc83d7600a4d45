//! Streaming chat-completion adapter.
//!
//! [`ChatClient`] calls any OpenAI-compatible `/v1/chat/completions`
//! endpoint with `stream: true`. Fragments are pushed to a [`ReplySink`]
//! as they arrive (progressive display) while being accumulated into the
//! final reply string. A transport failure mid-stream discards the partial
//! accumulation — the caller never sees half a reply as a success.

use async_trait::async_trait;
use futures::StreamExt;
use thiserror::Error;

use crate::config::AgentConfig;
use crate::history::Message;

// ---------------------------------------------------------------------------
// CompletionError
// ---------------------------------------------------------------------------

/// Errors that can occur during a completion call.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// HTTP transport or connection error, including mid-stream drops.
    #[error("completion request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("completion request timed out")]
    Timeout,

    /// The service answered with a non-success status.
    #[error("completion API error {status}: {body}")]
    Api { status: u16, body: String },

    /// A streamed payload could not be parsed.
    #[error("failed to parse completion response: {0}")]
    Parse(String),

    /// The stream finished but carried no usable text.
    #[error("model returned an empty reply")]
    EmptyReply,
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CompletionError::Timeout
        } else {
            CompletionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// ReplySink
// ---------------------------------------------------------------------------

/// Receives reply fragments as the stream delivers them.
pub trait ReplySink: Send {
    fn fragment(&mut self, text: &str);
}

// ---------------------------------------------------------------------------
// CompletionClient trait
// ---------------------------------------------------------------------------

/// Object-safe, thread-safe interface to a streaming chat-completion
/// service.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Stream a reply for `messages`, forwarding each fragment to `sink`.
    /// Returns the full accumulated reply, trimmed.
    async fn complete(
        &self,
        messages: &[Message],
        sink: &mut dyn ReplySink,
    ) -> Result<String, CompletionError>;
}

// ---------------------------------------------------------------------------
// SSE parsing
// ---------------------------------------------------------------------------

/// One meaningful event on the SSE stream.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Delta(String),
    Done,
}

/// Reassembles complete lines out of arbitrarily split body chunks.
///
/// The HTTP layer hands over byte chunks that may cut an SSE line anywhere;
/// the tail fragment is carried until its remainder arrives.
#[derive(Default)]
struct SseLineBuffer {
    carry: String,
}

impl SseLineBuffer {
    fn push(&mut self, chunk: &str) -> Vec<String> {
        self.carry.push_str(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.carry.find('\n') {
            let line = self.carry[..pos].trim_end_matches('\r').to_string();
            self.carry.drain(..=pos);
            lines.push(line);
        }
        lines
    }
}

/// Parse one SSE line. Non-`data:` lines and keep-alives yield `None`;
/// payloads without a text delta (role headers, finish chunks) also yield
/// `None`.
fn parse_sse_line(line: &str) -> Option<SseEvent> {
    let payload = line.strip_prefix("data:")?.trim();
    if payload == "[DONE]" {
        return Some(SseEvent::Done);
    }

    let json: serde_json::Value = serde_json::from_str(payload).ok()?;
    json["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|delta| !delta.is_empty())
        .map(|delta| SseEvent::Delta(delta.to_string()))
}

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Calls an OpenAI-compatible `/v1/chat/completions` endpoint.
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl ChatClient {
    /// Build a client from session config.
    ///
    /// Only the connect phase is bounded by the configured timeout — a
    /// whole-request timeout would cut long streamed replies short.
    pub fn from_config(config: &AgentConfig) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
        }
    }
}

#[async_trait]
impl CompletionClient for ChatClient {
    async fn complete(
        &self,
        messages: &[Message],
        sink: &mut dyn ReplySink,
    ) -> Result<String, CompletionError> {
        log::info!("Requesting response from {}.", self.model);

        let body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "stream": true,
        });

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut stream = response.bytes_stream();
        let mut lines = SseLineBuffer::default();
        let mut reply = String::new();

        'receive: while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for line in lines.push(&String::from_utf8_lossy(&chunk)) {
                match parse_sse_line(&line) {
                    Some(SseEvent::Done) => break 'receive,
                    Some(SseEvent::Delta(delta)) => {
                        sink.fragment(&delta);
                        reply.push_str(&delta);
                    }
                    None => {}
                }
            }
        }
        // End-of-body without [DONE] finalises the reply too; some
        // compatible servers close the stream silently.

        let reply = reply.trim().to_string();
        if reply.is_empty() {
            return Err(CompletionError::EmptyReply);
        }
        Ok(reply)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
