//! LLM types — provider-neutral stream events, errors and the streaming trait.
//!
//! Shared by the Google, Anthropic and `OpenAI` clients. Chat history uses the
//! wire [`Message`] directly; each provider maps roles onto its own vocabulary.

use std::pin::Pin;

use futures::Stream;

pub use wire::{FinishReason, Message, Role, Usage};

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by LLM client operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// A configuration value could not be parsed.
    #[error("config parse failed: {0}")]
    ConfigParse(String),

    /// The required API key environment variable is not set.
    #[error("missing API key: env var {var} not set")]
    MissingApiKey { var: String },

    /// The HTTP request to the LLM provider failed.
    #[error("API request failed: {0}")]
    ApiRequest(String),

    /// The LLM provider returned a non-success HTTP status.
    #[error("API response error: status {status}: {body}")]
    ApiResponse { status: u16, body: String },

    /// A stream event from the provider could not be deserialized.
    #[error("API response parse failed: {0}")]
    ApiParse(String),

    /// The provider reported an error inside an open stream.
    #[error("provider stream error: {0}")]
    Stream(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl LlmError {
    /// Stable code for log fields.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigParse(_) => "E_CONFIG_PARSE",
            Self::MissingApiKey { .. } => "E_MISSING_API_KEY",
            Self::ApiRequest(_) => "E_API_REQUEST",
            Self::ApiResponse { .. } => "E_API_RESPONSE",
            Self::ApiParse(_) => "E_API_PARSE",
            Self::Stream(_) => "E_STREAM",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }
}

// =============================================================================
// STREAM EVENTS
// =============================================================================

/// One provider-neutral event of a streamed completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Text to append to the reply.
    Delta(String),
    /// The provider signalled completion. Always the last event.
    Finish { reason: FinishReason, usage: Usage },
}

/// A streamed completion. Ends after [`StreamEvent::Finish`] or the first error.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

// =============================================================================
// LLM STREAM TRAIT
// =============================================================================

/// Provider-neutral async trait for streamed chat. Enables mocking in tests.
#[async_trait::async_trait]
pub trait LlmStream: Send + Sync {
    /// Open a streamed completion of `messages` under the `system` instruction.
    ///
    /// # Errors
    ///
    /// Returns an [`LlmError`] if the request cannot be sent or the provider
    /// rejects it before any output is produced. Failures after that point
    /// arrive as items of the returned stream.
    async fn stream(&self, max_tokens: Option<u32>, system: &str, messages: &[Message]) -> Result<TextStream, LlmError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
