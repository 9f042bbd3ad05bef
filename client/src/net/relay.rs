//! HTTP client for the chat relay.
//!
//! ERROR HANDLING
//! ==============
//! A non-success status is read as the relay's `{ "error": … }` body and
//! surfaced as [`RelayError::Server`]. Once the reply is streaming, transport
//! failures and undecodable lines arrive as stream items; the widget stops at
//! the first one.

#[cfg(test)]
#[path = "relay_test.rs"]
mod relay_test;

use std::collections::VecDeque;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use tracing::debug;
use wire::{ChatRequest, CodecError, ErrorBody, LineDecoder, Message, StreamPart};

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("chat request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("chat relay returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("invalid stream part: {0}")]
    Decode(#[from] CodecError),
    /// Error part sent by the relay after the reply started.
    #[error("{0}")]
    Remote(String),
}

/// Decoded reply parts, in arrival order.
pub type PartStream = Pin<Box<dyn Stream<Item = Result<StreamPart, RelayError>> + Send>>;

/// Sends a conversation and returns the streamed reply.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`RelayError`] if the request fails or the relay answers
    /// with an error status.
    async fn send(&self, messages: &[Message]) -> Result<PartStream, RelayError>;
}

// =============================================================================
// RELAY CLIENT
// =============================================================================

pub struct RelayClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self { http, endpoint: chat_endpoint(base_url) }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl ChatTransport for RelayClient {
    async fn send(&self, messages: &[Message]) -> Result<PartStream, RelayError> {
        let request = ChatRequest { messages: messages.to_vec() };
        let response = self.http.post(&self.endpoint).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(server_error(status.as_u16(), &body));
        }
        debug!(status = status.as_u16(), "relay: streaming reply");
        Ok(decode_parts(response.bytes_stream()))
    }
}

fn chat_endpoint(base_url: &str) -> String {
    format!("{}/api/chat", base_url.trim_end_matches('/'))
}

/// Build the error for a non-success response body.
fn server_error(status: u16, body: &str) -> RelayError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_owned());
    RelayError::Server { status, message }
}

// =============================================================================
// STREAM DECODING
// =============================================================================

struct PartReader<S> {
    body: Pin<Box<S>>,
    decoder: LineDecoder,
    pending: VecDeque<Result<StreamPart, RelayError>>,
    done: bool,
}

/// Decode a chunked response body into stream parts. Lines may span chunks.
pub fn decode_parts<S, B, E>(body: S) -> PartStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<RelayError> + Send + 'static,
{
    let reader = PartReader { body: Box::pin(body), decoder: LineDecoder::default(), pending: VecDeque::new(), done: false };
    futures::stream::unfold(reader, |mut reader| async move {
        loop {
            if let Some(item) = reader.pending.pop_front() {
                return Some((item, reader));
            }
            if reader.done {
                return None;
            }
            match reader.body.next().await {
                Some(Ok(chunk)) => {
                    let parts = reader.decoder.push(chunk.as_ref());
                    reader.pending.extend(parts.into_iter().map(|p| p.map_err(RelayError::from)));
                }
                Some(Err(e)) => {
                    reader.done = true;
                    reader.pending.push_back(Err(e.into()));
                }
                None => {
                    reader.done = true;
                    if let Some(tail) = reader.decoder.finish() {
                        reader.pending.push_back(tail.map_err(RelayError::from));
                    }
                }
            }
        }
    })
    .boxed()
}
