#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use wire::{Message, Role};

/// Id of the seeded greeting message.
pub const GREETING_ID: &str = "1";

/// Assistant greeting every conversation starts with.
pub const GREETING: &str = "Welcome to Apex Forge. I can help you find the right membership, book a tour, or answer training questions. What are your main goals for this year?";

/// How a fragment changed the conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Growth {
    /// The fragment created the assistant message.
    Started,
    /// The fragment was appended to the open assistant message.
    Extended,
}

/// State for the chat widget.
///
/// A submission moves through two phases: [`ChatState::begin_submit`]
/// appends the user message and raises `loading`; fragments then grow a
/// single assistant message until [`ChatState::finish`] or
/// [`ChatState::fail`] clears it.
#[derive(Clone, Debug)]
pub struct ChatState {
    pub messages: Vec<Message>,
    pub input: String,
    pub loading: bool,
    pub last_error: Option<String>,
    /// Id announced by the relay for the next assistant message.
    pending_id: Option<String>,
    /// Index of the assistant message the open stream is growing.
    streaming: Option<usize>,
}

impl Default for ChatState {
    fn default() -> Self {
        Self {
            messages: vec![Message { id: GREETING_ID.to_owned(), role: Role::Assistant, content: GREETING.to_owned() }],
            input: String::new(),
            loading: false,
            last_error: None,
            pending_id: None,
            streaming: None,
        }
    }
}

impl ChatState {
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Phase one: append the user message and mark the exchange in flight.
    ///
    /// Returns the history to send, or `None` when a request is already in
    /// flight or the input is blank.
    pub fn begin_submit(&mut self) -> Option<Vec<Message>> {
        if self.loading || self.input.trim().is_empty() {
            return None;
        }

        let content = std::mem::take(&mut self.input);
        self.messages.push(Message::user(content));
        self.loading = true;
        self.last_error = None;
        self.pending_id = None;
        self.streaming = None;
        Some(self.messages.clone())
    }

    /// Remember the relay's id for the assistant message about to start.
    pub fn start_message(&mut self, id: String) {
        if self.streaming.is_none() {
            self.pending_id = Some(id);
        }
    }

    /// Phase two: grow the assistant message by `text`.
    ///
    /// The first non-empty fragment creates the message. Returns `None` when
    /// nothing changed.
    pub fn push_fragment(&mut self, text: &str) -> Option<Growth> {
        if text.is_empty() {
            return None;
        }

        if let Some(index) = self.streaming {
            self.messages[index].content.push_str(text);
            return Some(Growth::Extended);
        }

        let id = self
            .pending_id
            .take()
            .unwrap_or_else(wire::new_message_id);
        self.messages.push(Message { id, role: Role::Assistant, content: text.to_owned() });
        self.streaming = Some(self.messages.len() - 1);
        Some(Growth::Started)
    }

    /// The stream ended normally.
    pub fn finish(&mut self) {
        self.loading = false;
        self.pending_id = None;
        self.streaming = None;
    }

    /// The exchange failed. Any partial assistant message is kept as is.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.finish();
        self.last_error = Some(error.into());
    }

    /// The assistant message currently growing, if any.
    pub fn streaming_message(&self) -> Option<&Message> {
        self.streaming.and_then(|i| self.messages.get(i))
    }
}
