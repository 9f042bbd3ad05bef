//! Anthropic Messages API client.
//!
//! Thin HTTP wrapper for streamed `/v1/messages`. Event translation lives in
//! [`AnthropicEvents`] so it can be tested without a network.

use serde_json::Value;
use std::time::Duration;

use super::config::LlmTimeouts;
use super::sse::{EventParser, SseEvent, open_stream, spawn_event_reader};
use super::types::{FinishReason, LlmError, Message, Role, StreamEvent, TextStream, Usage};

const API_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; used when no cap is configured.
const DEFAULT_MAX_TOKENS: u32 = 1024;

// =============================================================================
// CLIENT
// =============================================================================

pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, base_url: String, timeouts: LlmTimeouts) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url })
    }

    pub async fn stream(
        &self,
        model: &str,
        max_tokens: Option<u32>,
        system: &str,
        messages: &[Message],
    ) -> Result<TextStream, LlmError> {
        let turns = build_turns(messages);
        let max_tokens = max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let body = ApiRequest { model, max_tokens, system, messages: &turns, stream: true };

        let request = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body);

        let response = open_stream(request).await?;
        Ok(spawn_event_reader(response, AnthropicEvents::default()))
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(serde::Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: &'a [ApiMessage<'a>],
    stream: bool,
}

#[derive(Debug, serde::Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// The Messages API requires the first turn to come from the user, so any
/// leading assistant turns (such as a widget greeting) are skipped.
fn build_turns(messages: &[Message]) -> Vec<ApiMessage<'_>> {
    messages
        .iter()
        .skip_while(|m| m.role == Role::Assistant)
        .map(|m| ApiMessage { role: m.role.as_str(), content: &m.content })
        .collect()
}

// =============================================================================
// STREAM PARSING
// =============================================================================

/// Translates `message_start` / `content_block_delta` / `message_delta` /
/// `message_stop` events. Usage arrives split across the first and last events.
#[derive(Debug, Default)]
pub(crate) struct AnthropicEvents {
    usage: Usage,
    stop_reason: Option<String>,
}

impl EventParser for AnthropicEvents {
    fn parse(&mut self, event: &SseEvent) -> Result<Vec<StreamEvent>, LlmError> {
        let root: Value = serde_json::from_str(&event.data).map_err(|e| LlmError::ApiParse(e.to_string()))?;

        match root.get("type").and_then(Value::as_str) {
            Some("message_start") => {
                if let Some(tokens) = root
                    .pointer("/message/usage/input_tokens")
                    .and_then(Value::as_u64)
                {
                    self.usage.prompt_tokens = tokens;
                }
                Ok(Vec::new())
            }
            Some("content_block_delta") => {
                let delta = root.get("delta").cloned().unwrap_or(Value::Null);
                if delta.get("type").and_then(Value::as_str) != Some("text_delta") {
                    return Ok(Vec::new());
                }
                match delta.get("text").and_then(Value::as_str) {
                    Some(text) if !text.is_empty() => Ok(vec![StreamEvent::Delta(text.to_owned())]),
                    _ => Ok(Vec::new()),
                }
            }
            Some("message_delta") => {
                if let Some(reason) = root.pointer("/delta/stop_reason").and_then(Value::as_str) {
                    self.stop_reason = Some(reason.to_owned());
                }
                if let Some(tokens) = root
                    .pointer("/usage/output_tokens")
                    .and_then(Value::as_u64)
                {
                    self.usage.completion_tokens = tokens;
                }
                Ok(Vec::new())
            }
            Some("message_stop") => Ok(vec![StreamEvent::Finish {
                reason: map_stop_reason(self.stop_reason.as_deref()),
                usage: self.usage,
            }]),
            Some("error") => {
                let message = root
                    .pointer("/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                Err(LlmError::Stream(message.to_owned()))
            }
            _ => Ok(Vec::new()),
        }
    }
}

fn map_stop_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("end_turn" | "stop_sequence") => FinishReason::Stop,
        Some("max_tokens") => FinishReason::Length,
        Some("refusal") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Other,
        None => FinishReason::Unknown,
    }
}

#[cfg(test)]
#[path = "anthropic_test.rs"]
mod tests;
