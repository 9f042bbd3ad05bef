//! Chat widget — conversation state driven by relay exchanges.
//!
//! DESIGN
//! ======
//! The widget owns a [`ChatState`] and a [`ChatTransport`]. A submission is
//! one exchange: the user message is appended at once, the reply streams in
//! fragment by fragment, and the busy flag gates further submissions until
//! the stream ends. Rendering belongs to the host, which observes every
//! mutation through [`ChatView`].

#[cfg(test)]
#[path = "widget_test.rs"]
mod widget_test;

use futures::StreamExt;
use tracing::{debug, warn};
use wire::{Message, StreamPart};

use crate::net::relay::{ChatTransport, RelayError};
use crate::state::chat::{ChatState, Growth};

/// Receives conversation changes. Every method defaults to a no-op.
pub trait ChatView {
    /// A message was added to the conversation.
    fn message_appended(&mut self, _message: &Message) {}

    /// `fragment` was appended to the growing assistant `message`.
    fn fragment_appended(&mut self, _message: &Message, _fragment: &str) {}

    /// The in-flight flag changed. Input should be disabled while `busy`.
    fn busy_changed(&mut self, _busy: bool) {}

    /// The conversation changed; the latest message should be visible.
    fn scroll_to_latest(&mut self) {}

    /// The exchange ended with an error. No retry is attempted.
    fn exchange_failed(&mut self, _error: &RelayError) {}
}

/// Result of [`ChatWidget::submit`].
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Input was blank or an exchange was already in flight.
    Ignored,
    Completed,
    Failed(RelayError),
}

pub struct ChatWidget<T> {
    state: ChatState,
    transport: T,
}

impl<T: ChatTransport> ChatWidget<T> {
    pub fn new(transport: T) -> Self {
        Self { state: ChatState::default(), transport }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn messages(&self) -> &[Message] {
        &self.state.messages
    }

    pub fn is_busy(&self) -> bool {
        self.state.loading
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.state.set_input(text);
    }

    /// Send the current input and stream the reply into the conversation.
    pub async fn submit(&mut self, view: &mut dyn ChatView) -> SubmitOutcome {
        let Some(history) = self.state.begin_submit() else {
            return SubmitOutcome::Ignored;
        };
        if let Some(message) = self.state.messages.last() {
            view.message_appended(message);
        }
        view.busy_changed(true);
        view.scroll_to_latest();

        let outcome = match self.exchange(&history, view).await {
            Ok(()) => {
                self.state.finish();
                SubmitOutcome::Completed
            }
            Err(e) => {
                warn!(error = %e, "chat widget: exchange failed");
                self.state.fail(e.to_string());
                view.exchange_failed(&e);
                SubmitOutcome::Failed(e)
            }
        };
        view.busy_changed(false);
        outcome
    }

    async fn exchange(&mut self, history: &[Message], view: &mut dyn ChatView) -> Result<(), RelayError> {
        let mut parts = self.transport.send(history).await?;

        while let Some(part) = parts.next().await {
            match part? {
                StreamPart::StartMessage { message_id } => self.state.start_message(message_id),
                StreamPart::Text(text) => self.apply_fragment(&text, view),
                StreamPart::Error(message) => return Err(RelayError::Remote(message)),
                StreamPart::FinishMessage { finish_reason, usage } => {
                    debug!(?finish_reason, completion_tokens = usage.completion_tokens, "chat widget: reply finished");
                    return Ok(());
                }
                StreamPart::FinishStep { .. } | StreamPart::Unknown { .. } => {}
            }
        }
        Ok(())
    }

    fn apply_fragment(&mut self, text: &str, view: &mut dyn ChatView) {
        let Some(growth) = self.state.push_fragment(text) else {
            return;
        };
        let Some(message) = self.state.streaming_message() else {
            return;
        };
        match growth {
            Growth::Started => view.message_appended(message),
            Growth::Extended => view.fragment_appended(message, text),
        }
        view.scroll_to_latest();
    }
}
