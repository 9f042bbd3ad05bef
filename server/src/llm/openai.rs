//! OpenAI-compatible API client.
//!
//! Supports streamed `/v1/chat/completions` and `/v1/responses`. Each endpoint
//! has its own event parser; request bodies are built by pure functions.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::config::{LlmTimeouts, OpenAiApiMode};
use super::sse::{EventParser, SseEvent, open_stream, spawn_event_reader};
use super::types::{FinishReason, LlmError, Message, Role, StreamEvent, TextStream, Usage};

pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    mode: OpenAiApiMode,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        mode: OpenAiApiMode,
        base_url: String,
        timeouts: LlmTimeouts,
    ) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| LlmError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key, base_url, mode })
    }

    pub async fn stream(
        &self,
        model: &str,
        max_tokens: Option<u32>,
        system: &str,
        messages: &[Message],
    ) -> Result<TextStream, LlmError> {
        match self.mode {
            OpenAiApiMode::ChatCompletions => {
                let msgs = build_chat_completions_messages(system, messages);
                let body = CcRequest {
                    model,
                    max_tokens,
                    messages: &msgs,
                    stream: true,
                    stream_options: CcStreamOptions { include_usage: true },
                };
                let response = self.send_json("/chat/completions", &body).await?;
                Ok(spawn_event_reader(response, ChatCompletionEvents::default()))
            }
            OpenAiApiMode::Responses => {
                let input = build_responses_input(messages);
                let body = RespRequest {
                    model,
                    max_output_tokens: max_tokens,
                    instructions: system,
                    input: &input,
                    stream: true,
                };
                let response = self.send_json("/responses", &body).await?;
                Ok(spawn_event_reader(response, ResponsesEvents))
            }
        }
    }

    async fn send_json(&self, path: &str, body: &impl Serialize) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(body);
        open_stream(request).await
    }
}

// =============================================================================
// CHAT COMPLETIONS — wire types
// =============================================================================

#[derive(Serialize)]
struct CcRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    messages: &'a [CcMessage<'a>],
    stream: bool,
    stream_options: CcStreamOptions,
}

#[derive(Serialize)]
struct CcStreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct CcMessage<'a> {
    role: &'static str,
    content: &'a str,
}

fn build_chat_completions_messages<'a>(system: &'a str, messages: &'a [Message]) -> Vec<CcMessage<'a>> {
    let mut out = Vec::with_capacity(messages.len() + 1);
    if !system.trim().is_empty() {
        out.push(CcMessage { role: "system", content: system });
    }
    out.extend(
        messages
            .iter()
            .map(|m| CcMessage { role: m.role.as_str(), content: &m.content }),
    );
    out
}

// =============================================================================
// RESPONSES — wire types
// =============================================================================

#[derive(Serialize)]
struct RespRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    instructions: &'a str,
    input: &'a [RespInputItem<'a>],
    stream: bool,
}

#[derive(Debug, Serialize)]
struct RespInputItem<'a> {
    #[serde(rename = "type")]
    item_type: &'static str,
    role: &'static str,
    content: Vec<RespTextContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RespTextContent<'a> {
    #[serde(rename = "type")]
    content_type: &'static str,
    text: &'a str,
}

fn build_responses_input(messages: &[Message]) -> Vec<RespInputItem<'_>> {
    messages
        .iter()
        .map(|m| {
            // Prior assistant turns are replayed as model output, not input.
            let content_type = match m.role {
                Role::User => "input_text",
                Role::Assistant => "output_text",
            };
            RespInputItem {
                item_type: "message",
                role: m.role.as_str(),
                content: vec![RespTextContent { content_type, text: &m.content }],
            }
        })
        .collect()
}

// =============================================================================
// STREAM PARSING
// =============================================================================

/// Chat completions chunks. The finish reason arrives on the last choice
/// chunk, usage on a trailing choice-less chunk, and `[DONE]` closes the stream.
#[derive(Debug, Default)]
pub(crate) struct ChatCompletionEvents {
    finish_reason: Option<String>,
    usage: Usage,
}

impl EventParser for ChatCompletionEvents {
    fn parse(&mut self, event: &SseEvent) -> Result<Vec<StreamEvent>, LlmError> {
        if event.data.trim() == "[DONE]" {
            return Ok(vec![StreamEvent::Finish {
                reason: map_chat_finish_reason(self.finish_reason.as_deref()),
                usage: self.usage,
            }]);
        }

        let root: Value = serde_json::from_str(&event.data).map_err(|e| LlmError::ApiParse(e.to_string()))?;
        if let Some(message) = root.pointer("/error/message").and_then(Value::as_str) {
            return Err(LlmError::Stream(message.to_owned()));
        }

        if let Some(usage) = root.get("usage").filter(|u| !u.is_null()) {
            self.usage = Usage {
                prompt_tokens: usage
                    .get("prompt_tokens")
                    .and_then(Value::as_u64)
                    .unwrap_or(0),
                completion_tokens: usage
                    .get("completion_tokens")
                    .and_then(Value::as_u64)
                    .unwrap_or(0),
            };
        }

        let Some(choice) = root
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|arr| arr.first())
        else {
            return Ok(Vec::new());
        };
        if let Some(reason) = choice.get("finish_reason").and_then(Value::as_str) {
            self.finish_reason = Some(reason.to_owned());
        }
        match choice.pointer("/delta/content").and_then(Value::as_str) {
            Some(text) if !text.is_empty() => Ok(vec![StreamEvent::Delta(text.to_owned())]),
            _ => Ok(Vec::new()),
        }
    }
}

fn map_chat_finish_reason(reason: Option<&str>) -> FinishReason {
    match reason {
        Some("stop") => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some("content_filter") => FinishReason::ContentFilter,
        Some(_) => FinishReason::Other,
        None => FinishReason::Unknown,
    }
}

/// Responses API events, dispatched on the payload `type`.
#[derive(Debug, Default)]
pub(crate) struct ResponsesEvents;

impl EventParser for ResponsesEvents {
    fn parse(&mut self, event: &SseEvent) -> Result<Vec<StreamEvent>, LlmError> {
        let root: Value = serde_json::from_str(&event.data).map_err(|e| LlmError::ApiParse(e.to_string()))?;

        match root.get("type").and_then(Value::as_str) {
            Some("response.output_text.delta") => match root.get("delta").and_then(Value::as_str) {
                Some(text) if !text.is_empty() => Ok(vec![StreamEvent::Delta(text.to_owned())]),
                _ => Ok(Vec::new()),
            },
            Some("response.completed") => Ok(vec![StreamEvent::Finish {
                reason: FinishReason::Stop,
                usage: responses_usage(&root),
            }]),
            Some("response.incomplete") => {
                let reason = match root
                    .pointer("/response/incomplete_details/reason")
                    .and_then(Value::as_str)
                {
                    Some("max_output_tokens") => FinishReason::Length,
                    Some("content_filter") => FinishReason::ContentFilter,
                    _ => FinishReason::Other,
                };
                Ok(vec![StreamEvent::Finish { reason, usage: responses_usage(&root) }])
            }
            Some("response.failed") => {
                let message = root
                    .pointer("/response/error/message")
                    .and_then(Value::as_str)
                    .unwrap_or("response failed");
                Err(LlmError::Stream(message.to_owned()))
            }
            Some("error") => {
                let message = root
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error");
                Err(LlmError::Stream(message.to_owned()))
            }
            _ => Ok(Vec::new()),
        }
    }
}

fn responses_usage(root: &Value) -> Usage {
    Usage {
        prompt_tokens: root
            .pointer("/response/usage/input_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        completion_tokens: root
            .pointer("/response/usage/output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    }
}

#[cfg(test)]
#[path = "openai_test.rs"]
mod tests;
