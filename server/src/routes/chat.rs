//! `POST /api/chat` — streamed chat relay.
//!
//! The handler owns the relay's wall-clock budget. Opening the provider
//! stream and every later fragment race the same deadline; when it passes
//! before the reply ends, an in-band error part is written and the body
//! closes.

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::Json;
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::{Stream, StreamExt};
use tokio::time::Instant;
use tracing::warn;
use uuid::Uuid;
use wire::{ErrorBody, STREAM_CONTENT_TYPE, STREAM_PROTOCOL_HEADER, STREAM_PROTOCOL_VERSION, StreamPart, encode_part};

use crate::services::chat::{RelayError, open_relay, relay_parts};
use crate::state::AppState;

const PROTOCOL_HEADER: HeaderName = HeaderName::from_static(STREAM_PROTOCOL_HEADER);

pub async fn handle_chat(State(state): State<AppState>, body: Bytes) -> Response {
    let budget = state.relay.max_duration;
    let deadline = Instant::now() + budget;

    let upstream = match tokio::time::timeout_at(deadline, open_relay(&state, &body)).await {
        Ok(Ok(upstream)) => upstream,
        Ok(Err(e)) => return relay_error_response(&e),
        Err(_) => return relay_error_response(&RelayError::DeadlineExceeded(budget)),
    };

    let message_id = format!("msg-{}", Uuid::new_v4().simple());
    let parts = with_deadline(relay_parts(upstream, message_id), deadline, budget);
    let lines = parts.map(|part| Ok::<Bytes, std::convert::Infallible>(Bytes::from(encode_part(&part))));

    (
        [(CONTENT_TYPE, STREAM_CONTENT_TYPE), (PROTOCOL_HEADER, STREAM_PROTOCOL_VERSION)],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Map a pre-stream relay failure to a `500` JSON error body.
pub(crate) fn relay_error_response(err: &RelayError) -> Response {
    warn!(error = %err, code = err.error_code(), "chat: relay failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody { error: err.to_string() })).into_response()
}

/// Pass `parts` through until `deadline`, then emit one error part and end.
fn with_deadline(
    parts: impl Stream<Item = StreamPart> + Send + 'static,
    deadline: Instant,
    budget: std::time::Duration,
) -> impl Stream<Item = StreamPart> + Send {
    let parts = Box::pin(parts);
    futures::stream::unfold(Some(parts), move |parts| async move {
        let mut parts = parts?;
        match tokio::time::timeout_at(deadline, parts.next()).await {
            Ok(Some(part)) => Some((part, Some(parts))),
            Ok(None) => None,
            Err(_) => {
                let err = RelayError::DeadlineExceeded(budget);
                warn!(error = %err, "chat: cutting stream");
                Some((StreamPart::Error(err.to_string()), None))
            }
        }
    })
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
