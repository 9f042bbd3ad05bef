//! LLM — multi-provider streaming adapter for the chat relay.
//!
//! DESIGN
//! ======
//! Configuration comes from environment variables rather than config files.
//! The `LlmClient` enum dispatches to Google, Anthropic or `OpenAI` based on
//! `LLM_PROVIDER`. Every provider streams its reply; the shared SSE reader in
//! [`sse`] turns provider events into [`types::StreamEvent`]s.

pub mod anthropic;
pub mod config;
pub mod google;
pub mod openai;
pub mod sse;
pub mod types;

use config::{LlmConfig, LlmProviderKind};
pub use types::LlmStream;
use types::{LlmError, Message, TextStream};

// =============================================================================
// CLIENT DISPATCH
// =============================================================================

/// Concrete LLM client that dispatches to the configured provider.
///
/// Configured from environment variables by [`LlmClient::from_env`].
pub struct LlmClient {
    inner: LlmProvider,
    model: String,
}

enum LlmProvider {
    Google(google::GoogleClient),
    Anthropic(anthropic::AnthropicClient),
    OpenAi(openai::OpenAiClient),
}

impl LlmClient {
    /// Build an LLM client from environment variables. See
    /// [`LlmConfig::from_env`] for the variables read.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, LlmError> {
        let config = LlmConfig::from_env()?;
        Self::from_config(config)
    }

    /// Build an LLM client from a parsed typed config.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider HTTP client fails to build.
    pub fn from_config(config: LlmConfig) -> Result<Self, LlmError> {
        let model = config.model.clone();
        let inner = match config.provider {
            LlmProviderKind::Google => {
                LlmProvider::Google(google::GoogleClient::new(config.api_key, config.base_url, config.timeouts)?)
            }
            LlmProviderKind::Anthropic => LlmProvider::Anthropic(anthropic::AnthropicClient::new(
                config.api_key,
                config.base_url,
                config.timeouts,
            )?),
            LlmProviderKind::OpenAi => LlmProvider::OpenAi(openai::OpenAiClient::new(
                config.api_key,
                config.openai_mode,
                config.base_url,
                config.timeouts,
            )?),
        };
        Ok(Self { inner, model })
    }

    /// Return the configured model name (e.g. `"gemini-2.5-flash"`).
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Short provider name for logs.
    #[must_use]
    pub fn provider(&self) -> &'static str {
        match &self.inner {
            LlmProvider::Google(_) => "google",
            LlmProvider::Anthropic(_) => "anthropic",
            LlmProvider::OpenAi(_) => "openai",
        }
    }
}

#[async_trait::async_trait]
impl LlmStream for LlmClient {
    async fn stream(&self, max_tokens: Option<u32>, system: &str, messages: &[Message]) -> Result<TextStream, LlmError> {
        match &self.inner {
            LlmProvider::Google(c) => c.stream(&self.model, max_tokens, system, messages).await,
            LlmProvider::Anthropic(c) => c.stream(&self.model, max_tokens, system, messages).await,
            LlmProvider::OpenAi(c) => c.stream(&self.model, max_tokens, system, messages).await,
        }
    }
}
