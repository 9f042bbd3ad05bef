//! Server-sent-event plumbing shared by the streaming provider clients.
//!
//! DESIGN
//! ======
//! Every provider streams its completion as SSE. The byte stream is read by a
//! spawned task that splits it into events, hands each event to a
//! provider-specific [`EventParser`], and forwards the resulting
//! [`StreamEvent`]s through a bounded channel. The channel is the only
//! buffering between the provider and the relay; when the receiver is dropped
//! the next send fails and the task stops reading.

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use super::types::{FinishReason, LlmError, StreamEvent, TextStream, Usage};

const STREAM_CHANNEL_CAPACITY: usize = 32;

// =============================================================================
// DECODER
// =============================================================================

/// One dispatched server-sent event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, when present.
    pub event: Option<String>,
    /// `data:` lines joined with `\n`.
    pub data: String,
}

/// Incremental SSE decoder. Accepts arbitrary chunk boundaries and CRLF.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed a chunk and return every event it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line[..pos]);
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                out.push(event);
            }
        }
        out
    }

    /// Flush a final event whose terminating blank line never arrived.
    pub fn finish(&mut self) -> Option<SseEvent> {
        let rest = std::mem::take(&mut self.buf);
        if !rest.is_empty() {
            let line = String::from_utf8_lossy(&rest).into_owned();
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_owned()),
            "data" => self.data.push(value.to_owned()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        if self.data.is_empty() && self.event.is_none() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event: self.event.take(), data })
    }
}

// =============================================================================
// READER TASK
// =============================================================================

/// Provider-specific translation of SSE events into stream events.
pub trait EventParser: Send + 'static {
    /// Translate one event. An `Err` ends the stream after being forwarded.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ApiParse`] for malformed event payloads and
    /// [`LlmError::Stream`] for provider-reported errors.
    fn parse(&mut self, event: &SseEvent) -> Result<Vec<StreamEvent>, LlmError>;
}

/// Send the request and fail unless the provider answers `200`.
pub(crate) async fn open_stream(request: reqwest::RequestBuilder) -> Result<reqwest::Response, LlmError> {
    let response = request
        .send()
        .await
        .map_err(|e| LlmError::ApiRequest(e.to_string()))?;

    let status = response.status().as_u16();
    if status != 200 {
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::ApiRequest(e.to_string()))?;
        return Err(LlmError::ApiResponse { status, body });
    }
    Ok(response)
}

/// Spawn the reader task for an open provider response.
pub(crate) fn spawn_event_reader<P: EventParser>(response: reqwest::Response, parser: P) -> TextStream {
    let (tx, rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    tokio::spawn(read_events(response, parser, tx));
    Box::pin(ReceiverStream::new(rx))
}

type EventSender = mpsc::Sender<Result<StreamEvent, LlmError>>;

async fn read_events<P: EventParser>(response: reqwest::Response, mut parser: P, tx: EventSender) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::default();

    while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                let _ = tx.send(Err(LlmError::ApiRequest(e.to_string()))).await;
                return;
            }
        };
        for event in decoder.push(&chunk) {
            if !forward(&mut parser, &event, &tx).await {
                return;
            }
        }
    }

    if let Some(event) = decoder.finish() {
        if !forward(&mut parser, &event, &tx).await {
            return;
        }
    }

    // The provider closed the body without a completion signal.
    let finish = StreamEvent::Finish { reason: FinishReason::Unknown, usage: Usage::default() };
    let _ = tx.send(Ok(finish)).await;
}

/// Parse and forward one event. Returns `false` once the stream is over.
async fn forward<P: EventParser>(parser: &mut P, event: &SseEvent, tx: &EventSender) -> bool {
    let items = match parser.parse(event) {
        Ok(items) => items,
        Err(e) => {
            let _ = tx.send(Err(e)).await;
            return false;
        }
    };

    for item in items {
        let done = matches!(item, StreamEvent::Finish { .. });
        if tx.send(Ok(item)).await.is_err() {
            debug!("llm stream: receiver dropped");
            return false;
        }
        if done {
            return false;
        }
    }
    true
}

#[cfg(test)]
#[path = "sse_test.rs"]
mod tests;
