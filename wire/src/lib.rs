//! Shared chat model and streaming line codec for the relay transport.
//!
//! This crate owns the wire representation used by both `server` and `client`.
//! A chat reply travels as a sequence of newline-terminated stream parts, each
//! written as `<code>:<json>`, so a reader can act on every fragment as soon as
//! its line is complete. The codes follow the data-stream format understood by
//! the AI SDK chat hooks (`0` text, `3` error, `f`/`e`/`d` message framing).

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// `Content-Type` of a streamed chat reply.
pub const STREAM_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
/// Header announcing the stream part protocol to the reader.
pub const STREAM_PROTOCOL_HEADER: &str = "x-vercel-ai-data-stream";
/// Protocol version sent in [`STREAM_PROTOCOL_HEADER`].
pub const STREAM_PROTOCOL_VERSION: &str = "v1";

/// Error returned by [`decode_part`] and [`LineDecoder`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The line has no `<code>:` prefix.
    #[error("stream part has no type code: {0}")]
    MissingCode(String),
    /// The JSON after the code did not match the part's payload shape.
    #[error("invalid stream part payload: {0}")]
    Payload(#[from] serde_json::Error),
}

// =============================================================================
// CHAT MODEL
// =============================================================================

/// Author of a chat message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single chat message. Callers may omit `id`; a fresh one is assigned.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "new_message_id")]
    pub id: String,
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { id: new_message_id(), role, content: content.into() }
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Fresh random message identifier.
#[must_use]
pub fn new_message_id() -> String {
    Uuid::new_v4().to_string()
}

/// Body of `POST /api/chat`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

/// Non-streaming error body returned with a `500`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// =============================================================================
// STREAM PARTS
// =============================================================================

/// Why the model stopped producing output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    Error,
    Other,
    #[serde(other)]
    Unknown,
}

/// Token accounting reported at the end of a reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// One line of a streamed chat reply.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamPart {
    /// `f:` opens the assistant message.
    StartMessage { message_id: String },
    /// `0:` a text fragment to append to the assistant message.
    Text(String),
    /// `3:` an error raised after the stream started.
    Error(String),
    /// `e:` end of one generation step.
    FinishStep { finish_reason: FinishReason, usage: Usage, is_continued: bool },
    /// `d:` end of the whole reply.
    FinishMessage { finish_reason: FinishReason, usage: Usage },
    /// Any part type this crate does not model. Readers skip these.
    Unknown { code: String, payload: Value },
}

impl StreamPart {
    /// `true` for the part that closes the reply.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FinishMessage { .. } | Self::Error(_))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartPayload {
    message_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinishPayload {
    finish_reason: FinishReason,
    #[serde(default)]
    usage: Usage,
    #[serde(default)]
    is_continued: bool,
}

/// Encode a part as one newline-terminated line.
#[must_use]
pub fn encode_part(part: &StreamPart) -> String {
    let (code, payload) = match part {
        StreamPart::StartMessage { message_id } => ("f", json!({ "messageId": message_id })),
        StreamPart::Text(text) => ("0", Value::String(text.clone())),
        StreamPart::Error(message) => ("3", Value::String(message.clone())),
        StreamPart::FinishStep { finish_reason, usage, is_continued } => (
            "e",
            json!({ "finishReason": finish_reason, "usage": usage, "isContinued": is_continued }),
        ),
        StreamPart::FinishMessage { finish_reason, usage } => {
            ("d", json!({ "finishReason": finish_reason, "usage": usage }))
        }
        StreamPart::Unknown { code, payload } => (code.as_str(), payload.clone()),
    };
    format!("{code}:{payload}\n")
}

/// Decode one line (without its trailing newline) into a part.
///
/// # Errors
///
/// Returns [`CodecError::MissingCode`] when the line has no `<code>:` prefix
/// and [`CodecError::Payload`] when a known code carries malformed JSON.
pub fn decode_part(line: &str) -> Result<StreamPart, CodecError> {
    let Some((code, payload)) = line.split_once(':') else {
        return Err(CodecError::MissingCode(line.to_owned()));
    };

    let part = match code {
        "f" => {
            let start: StartPayload = serde_json::from_str(payload)?;
            StreamPart::StartMessage { message_id: start.message_id }
        }
        "0" => StreamPart::Text(serde_json::from_str(payload)?),
        "3" => StreamPart::Error(serde_json::from_str(payload)?),
        "e" => {
            let finish: FinishPayload = serde_json::from_str(payload)?;
            StreamPart::FinishStep {
                finish_reason: finish.finish_reason,
                usage: finish.usage,
                is_continued: finish.is_continued,
            }
        }
        "d" => {
            let finish: FinishPayload = serde_json::from_str(payload)?;
            StreamPart::FinishMessage { finish_reason: finish.finish_reason, usage: finish.usage }
        }
        other => StreamPart::Unknown { code: other.to_owned(), payload: serde_json::from_str(payload)? },
    };
    Ok(part)
}

// =============================================================================
// LINE DECODER
// =============================================================================

/// Incremental decoder for a chunked reply body.
///
/// Network chunks do not respect line boundaries; bytes are buffered until a
/// newline completes a part. Newlines never occur inside a UTF-8 multi-byte
/// sequence, so splitting on `\n` before decoding is safe.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
}

impl LineDecoder {
    /// Feed a chunk and return every part it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamPart, CodecError>> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let text = String::from_utf8_lossy(&line[..pos]);
            let text = text.trim_end_matches('\r');
            if text.is_empty() {
                continue;
            }
            out.push(decode_part(text));
        }
        out
    }

    /// Decode whatever is left once the body has ended without a final newline.
    pub fn finish(&mut self) -> Option<Result<StreamPart, CodecError>> {
        let rest = std::mem::take(&mut self.buf);
        let text = String::from_utf8_lossy(&rest);
        let text = text.trim();
        if text.is_empty() { None } else { Some(decode_part(text)) }
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
