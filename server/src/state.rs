//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. The
//! relay keeps no per-session data, so the state is immutable after startup:
//! the provider client, the rendered system prompt and the relay limits.

use std::sync::Arc;

use crate::config::RelayConfig;
use crate::llm::LlmStream;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    /// Optional LLM client. `None` if LLM env vars are not configured.
    pub llm: Option<Arc<dyn LlmStream>>,
    /// System instruction prepended to every relayed conversation.
    pub system_prompt: Arc<str>,
    pub relay: RelayConfig,
}

impl AppState {
    #[must_use]
    pub fn new(llm: Option<Arc<dyn LlmStream>>, system_prompt: impl Into<Arc<str>>, relay: RelayConfig) -> Self {
        Self { llm, system_prompt: system_prompt.into(), relay }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};

    use futures::StreamExt;

    use crate::llm::types::{LlmError, Message, StreamEvent, TextStream};

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    /// Serialize tests that read or write process environment variables.
    pub fn env_lock() -> MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One `stream` call as seen by [`MockLlm`].
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub max_tokens: Option<u32>,
        pub system: String,
        pub messages: Vec<Message>,
    }

    /// Scripted provider. Replays the same events on every call.
    pub struct MockLlm {
        events: Vec<Result<StreamEvent, String>>,
        open_error: Option<String>,
        stall_open: bool,
        hang: bool,
        pub calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockLlm {
        /// Stream `events`; an `Err` item becomes an in-stream provider error.
        #[must_use]
        pub fn new(events: Vec<Result<StreamEvent, String>>) -> Self {
            Self { events, open_error: None, stall_open: false, hang: false, calls: Mutex::new(Vec::new()) }
        }

        /// Reject the request before any output, like a `429` from the provider.
        #[must_use]
        pub fn failing(body: &str) -> Self {
            Self { open_error: Some(body.to_owned()), ..Self::new(Vec::new()) }
        }

        /// Never answer the request, so no stream is ever opened.
        #[must_use]
        pub fn stalled() -> Self {
            Self { stall_open: true, ..Self::new(Vec::new()) }
        }

        /// Stream `events`, then never finish.
        #[must_use]
        pub fn hanging(events: Vec<Result<StreamEvent, String>>) -> Self {
            Self { hang: true, ..Self::new(events) }
        }
    }

    #[async_trait::async_trait]
    impl LlmStream for MockLlm {
        async fn stream(&self, max_tokens: Option<u32>, system: &str, messages: &[Message]) -> Result<TextStream, LlmError> {
            self.calls.lock().unwrap().push(RecordedCall {
                max_tokens,
                system: system.to_owned(),
                messages: messages.to_vec(),
            });
            if self.stall_open {
                futures::future::pending::<()>().await;
            }
            if let Some(body) = &self.open_error {
                return Err(LlmError::ApiResponse { status: 429, body: body.clone() });
            }

            let items: Vec<Result<StreamEvent, LlmError>> = self
                .events
                .iter()
                .cloned()
                .map(|item| item.map_err(LlmError::Stream))
                .collect();
            let scripted = futures::stream::iter(items);
            if self.hang {
                Ok(scripted.chain(futures::stream::pending()).boxed())
            } else {
                Ok(scripted.boxed())
            }
        }
    }

    /// Create a test `AppState` with no LLM configured.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::new(None, "You are a test coach.", RelayConfig::default())
    }

    /// Create a test `AppState` with a mock LLM.
    #[must_use]
    pub fn test_app_state_with_llm(llm: Arc<dyn LlmStream>) -> AppState {
        AppState::new(Some(llm), "You are a test coach.", RelayConfig::default())
    }
}
