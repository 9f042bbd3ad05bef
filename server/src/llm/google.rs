//! Google Gemini `streamGenerateContent` client.
//!
//! Requests `alt=sse` so the reply arrives as one JSON chunk per event. Each
//! chunk may carry text parts, usage metadata and, on the last one, a finish
//! reason.

use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use super::config::LlmTimeouts;
use super::sse::{EventParser, SseEvent, open_stream, spawn_event_reader};
use super::types::{FinishReason, LlmError, Message, Role, StreamEvent, TextStream, Usage};

pub struct GoogleClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GoogleClient {
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
        let body = build_request(max_tokens, system, messages);
        let url = format!("{}/models/{model}:streamGenerateContent?alt=sse", self.base_url);

        let request = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body);

        let response = open_stream(request).await?;
        Ok(spawn_event_reader(response, GoogleEvents::default()))
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
}

fn build_request<'a>(max_tokens: Option<u32>, system: &'a str, messages: &'a [Message]) -> GenerateRequest<'a> {
    let system_instruction =
        (!system.trim().is_empty()).then(|| SystemInstruction { parts: [Part { text: system }] });
    let contents = messages
        .iter()
        .map(|m| Content { role: gemini_role(m.role), parts: [Part { text: &m.content }] })
        .collect();
    let generation_config = max_tokens.map(|max_output_tokens| GenerationConfig { max_output_tokens });
    GenerateRequest { system_instruction, contents, generation_config }
}

fn gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

// =============================================================================
// STREAM PARSING
// =============================================================================

#[derive(Debug, Default)]
pub(crate) struct GoogleEvents {
    usage: Usage,
}

impl EventParser for GoogleEvents {
    fn parse(&mut self, event: &SseEvent) -> Result<Vec<StreamEvent>, LlmError> {
        let root: Value = serde_json::from_str(&event.data).map_err(|e| LlmError::ApiParse(e.to_string()))?;

        if let Some(message) = root.pointer("/error/message").and_then(Value::as_str) {
            return Err(LlmError::Stream(message.to_owned()));
        }

        if let Some(meta) = root.get("usageMetadata") {
            if let Some(tokens) = meta.get("promptTokenCount").and_then(Value::as_u64) {
                self.usage.prompt_tokens = tokens;
            }
            if let Some(tokens) = meta.get("candidatesTokenCount").and_then(Value::as_u64) {
                self.usage.completion_tokens = tokens;
            }
        }

        if root.pointer("/promptFeedback/blockReason").is_some() {
            return Ok(vec![StreamEvent::Finish { reason: FinishReason::ContentFilter, usage: self.usage }]);
        }

        let Some(candidate) = root.pointer("/candidates/0") else {
            return Ok(Vec::new());
        };

        let mut out: Vec<StreamEvent> = candidate
            .pointer("/content/parts")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
            // Thought summaries are not part of the reply.
            .filter(|part| part.get("thought").and_then(Value::as_bool) != Some(true))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .filter(|text| !text.is_empty())
            .map(|text| StreamEvent::Delta(text.to_owned()))
            .collect();

        if let Some(reason) = candidate.get("finishReason").and_then(Value::as_str) {
            out.push(StreamEvent::Finish { reason: map_finish_reason(reason), usage: self.usage });
        }
        Ok(out)
    }
}

fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => FinishReason::ContentFilter,
        "FINISH_REASON_UNSPECIFIED" => FinishReason::Unknown,
        _ => FinishReason::Other,
    }
}

#[cfg(test)]
#[path = "google_test.rs"]
mod tests;
