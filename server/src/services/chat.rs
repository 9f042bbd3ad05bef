//! Chat relay service — forwards a conversation to the provider and
//! translates the provider stream into wire stream parts.
//!
//! DESIGN
//! ======
//! The relay is stateless. [`open_relay`] parses the request and opens the
//! provider stream; every failure up to that point is a [`RelayError`] that
//! the route maps to a `500`. Once the provider stream is open,
//! [`relay_parts`] frames it as `f:` → `0:`* → `e:` `d:`, and a provider error
//! becomes a single in-band `3:` part that ends the reply. Fragments are
//! passed through one by one; nothing buffers the whole reply.

use std::time::Duration;

use futures::{Stream, StreamExt};
use tracing::{info, warn};
use wire::{ChatRequest, StreamPart};

use crate::llm::types::{FinishReason, LlmError, StreamEvent, TextStream, Usage};
use crate::state::AppState;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("malformed chat request: {0}")]
    MalformedRequest(#[from] serde_json::Error),
    #[error("LLM not configured")]
    LlmNotConfigured,
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("chat relay exceeded its {0:?} time budget")]
    DeadlineExceeded(Duration),
}

impl RelayError {
    /// Stable code for log fields.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "E_MALFORMED_REQUEST",
            Self::LlmNotConfigured => "E_LLM_NOT_CONFIGURED",
            Self::Llm(e) => e.error_code(),
            Self::DeadlineExceeded(_) => "E_DEADLINE",
        }
    }
}

/// Parse a `POST /api/chat` body and open the provider stream.
///
/// # Errors
///
/// Returns [`RelayError::MalformedRequest`] for an unparseable body,
/// [`RelayError::LlmNotConfigured`] when no provider is configured and
/// [`RelayError::Llm`] when the provider rejects the request.
pub async fn open_relay(state: &AppState, body: &[u8]) -> Result<TextStream, RelayError> {
    let request: ChatRequest = serde_json::from_slice(body)?;
    info!(messages = request.messages.len(), "chat: request received");

    let llm = state.llm.as_ref().ok_or(RelayError::LlmNotConfigured)?;
    let upstream = llm
        .stream(state.relay.max_tokens, &state.system_prompt, &request.messages)
        .await?;
    Ok(upstream)
}

// =============================================================================
// STREAM FRAMING
// =============================================================================

enum Phase {
    Start,
    Streaming,
    Done,
}

struct Relay {
    upstream: TextStream,
    message_id: String,
    phase: Phase,
    chars: usize,
}

/// Frame a provider stream as wire stream parts for message `message_id`.
pub fn relay_parts(upstream: TextStream, message_id: String) -> impl Stream<Item = StreamPart> + Send {
    let relay = Relay { upstream, message_id, phase: Phase::Start, chars: 0 };
    futures::stream::unfold(relay, |mut relay| async move {
        let parts = next_parts(&mut relay).await?;
        Some((parts, relay))
    })
    .flat_map(futures::stream::iter)
}

async fn next_parts(relay: &mut Relay) -> Option<Vec<StreamPart>> {
    match relay.phase {
        Phase::Start => {
            relay.phase = Phase::Streaming;
            Some(vec![StreamPart::StartMessage { message_id: relay.message_id.clone() }])
        }
        Phase::Streaming => {
            let parts = match relay.upstream.next().await {
                Some(Ok(StreamEvent::Delta(text))) => {
                    relay.chars += text.len();
                    return Some(vec![StreamPart::Text(text)]);
                }
                Some(Ok(StreamEvent::Finish { reason, usage })) => finish_parts(relay, reason, usage),
                // Providers signal completion; a bare end of stream is still closed cleanly.
                None => finish_parts(relay, FinishReason::Unknown, Usage::default()),
                Some(Err(e)) => {
                    warn!(message_id = %relay.message_id, error = %e, code = e.error_code(), "chat: provider stream failed");
                    vec![StreamPart::Error(e.to_string())]
                }
            };
            relay.phase = Phase::Done;
            Some(parts)
        }
        Phase::Done => None,
    }
}

fn finish_parts(relay: &Relay, reason: FinishReason, usage: Usage) -> Vec<StreamPart> {
    info!(
        message_id = %relay.message_id,
        chars = relay.chars,
        finish_reason = ?reason,
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        "chat: stream completed"
    );
    vec![
        StreamPart::FinishStep { finish_reason: reason, usage, is_continued: false },
        StreamPart::FinishMessage { finish_reason: reason, usage },
    ]
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
