use super::*;
use std::sync::Mutex;

use wire::{FinishReason, Role, Usage};

use crate::net::relay::PartStream;

// =========================================================================
// MockTransport / RecordingView
// =========================================================================

enum Script {
    Parts(Vec<Result<StreamPart, String>>),
    Reject(u16, &'static str),
}

struct MockTransport {
    script: Script,
    sent: Mutex<Vec<Vec<Message>>>,
}

impl MockTransport {
    fn replying(parts: Vec<Result<StreamPart, String>>) -> Self {
        Self { script: Script::Parts(parts), sent: Mutex::new(Vec::new()) }
    }

    fn rejecting(status: u16, message: &'static str) -> Self {
        Self { script: Script::Reject(status, message), sent: Mutex::new(Vec::new()) }
    }
}

#[async_trait::async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, messages: &[Message]) -> Result<PartStream, RelayError> {
        self.sent.lock().unwrap().push(messages.to_vec());
        match &self.script {
            Script::Parts(parts) => {
                let items: Vec<Result<StreamPart, RelayError>> = parts
                    .iter()
                    .cloned()
                    .map(|p| p.map_err(RelayError::Remote))
                    .collect();
                Ok(futures::stream::iter(items).boxed())
            }
            Script::Reject(status, message) => {
                Err(RelayError::Server { status: *status, message: (*message).to_owned() })
            }
        }
    }
}

#[derive(Default)]
struct RecordingView {
    events: Vec<String>,
}

impl ChatView for RecordingView {
    fn message_appended(&mut self, message: &Message) {
        self.events.push(format!("append {}:{}", message.role.as_str(), message.content));
    }

    fn fragment_appended(&mut self, _message: &Message, fragment: &str) {
        self.events.push(format!("fragment {fragment}"));
    }

    fn busy_changed(&mut self, busy: bool) {
        self.events.push(format!("busy {busy}"));
    }

    fn scroll_to_latest(&mut self) {
        self.events.push("scroll".into());
    }

    fn exchange_failed(&mut self, error: &RelayError) {
        self.events.push(format!("failed {error}"));
    }
}

fn reply(fragments: &[&str]) -> Vec<Result<StreamPart, String>> {
    let usage = Usage { prompt_tokens: 10, completion_tokens: 4 };
    let mut parts = vec![Ok(StreamPart::StartMessage { message_id: "msg-xyz".into() })];
    parts.extend(fragments.iter().map(|f| Ok(StreamPart::Text((*f).to_owned()))));
    parts.push(Ok(StreamPart::FinishStep { finish_reason: FinishReason::Stop, usage, is_continued: false }));
    parts.push(Ok(StreamPart::FinishMessage { finish_reason: FinishReason::Stop, usage }));
    parts
}

// =========================================================================
// submit
// =========================================================================

#[test]
fn new_widget_has_greeting() {
    let widget = ChatWidget::new(MockTransport::replying(vec![]));
    assert_eq!(widget.messages().len(), 1);
    assert_eq!(widget.messages()[0].id, "1");
    assert!(!widget.is_busy());
}

#[tokio::test]
async fn submit_streams_reply_into_one_message() {
    let mut widget = ChatWidget::new(MockTransport::replying(reply(&["Hit ", "the Forge ", "Pass."])));
    let mut view = RecordingView::default();

    widget.set_input("Best plan for strength?");
    let outcome = widget.submit(&mut view).await;

    assert!(matches!(outcome, SubmitOutcome::Completed));
    assert!(!widget.is_busy());

    let messages = widget.messages();
    assert_eq!(messages.len(), 3);
    assert_eq!(messages[1].role, Role::User);
    assert_eq!(messages[1].content, "Best plan for strength?");
    assert_eq!(messages[2].id, "msg-xyz");
    assert_eq!(messages[2].content, "Hit the Forge Pass.");

    assert_eq!(
        view.events,
        vec![
            "append user:Best plan for strength?",
            "busy true",
            "scroll",
            "append assistant:Hit ",
            "scroll",
            "fragment the Forge ",
            "scroll",
            "fragment Pass.",
            "scroll",
            "busy false",
        ]
    );
}

#[tokio::test]
async fn submit_sends_full_history_including_greeting() {
    let transport = MockTransport::replying(reply(&["ok"]));
    let mut widget = ChatWidget::new(transport);
    let mut view = RecordingView::default();

    widget.set_input("first");
    widget.submit(&mut view).await;
    widget.set_input("second");
    widget.submit(&mut view).await;

    let sent = widget.transport.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].len(), 2);
    assert_eq!(sent[0][0].id, "1");
    // greeting, first, reply, second
    assert_eq!(sent[1].len(), 4);
    assert_eq!(sent[1][3].content, "second");
}

#[tokio::test]
async fn blank_submit_is_ignored() {
    let mut widget = ChatWidget::new(MockTransport::replying(reply(&["unused"])));
    let mut view = RecordingView::default();

    widget.set_input("  ");
    let outcome = widget.submit(&mut view).await;

    assert!(matches!(outcome, SubmitOutcome::Ignored));
    assert!(view.events.is_empty());
    assert!(widget.transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn submit_while_busy_is_ignored() {
    let mut widget = ChatWidget::new(MockTransport::replying(reply(&["unused"])));
    let mut view = RecordingView::default();

    widget.state.loading = true;
    widget.set_input("hello?");
    let outcome = widget.submit(&mut view).await;

    assert!(matches!(outcome, SubmitOutcome::Ignored));
    assert_eq!(widget.messages().len(), 1);
    assert!(widget.transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn rejected_request_keeps_user_message_and_clears_busy() {
    let mut widget = ChatWidget::new(MockTransport::rejecting(500, "LLM not configured"));
    let mut view = RecordingView::default();

    widget.set_input("anyone there?");
    let outcome = widget.submit(&mut view).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(RelayError::Server { status: 500, .. })));
    assert!(!widget.is_busy());
    assert_eq!(widget.messages().len(), 2);
    assert_eq!(widget.state().last_error.as_deref(), Some("chat relay returned 500: LLM not configured"));
    assert_eq!(view.events.last().map(String::as_str), Some("busy false"));
}

#[tokio::test]
async fn in_band_error_keeps_partial_reply() {
    let parts = vec![
        Ok(StreamPart::StartMessage { message_id: "msg-1".into() }),
        Ok(StreamPart::Text("Our coaches".into())),
        Ok(StreamPart::Error("provider stream error: overloaded".into())),
        Ok(StreamPart::Text("never applied".into())),
    ];
    let mut widget = ChatWidget::new(MockTransport::replying(parts));
    let mut view = RecordingView::default();

    widget.set_input("coaching?");
    let outcome = widget.submit(&mut view).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(RelayError::Remote(_))));
    assert_eq!(widget.messages().len(), 3);
    assert_eq!(widget.messages()[2].content, "Our coaches");
    assert!(!widget.is_busy());
    assert!(view.events.iter().any(|e| e.starts_with("failed provider stream error")));
}

#[tokio::test]
async fn transport_error_mid_stream_fails_exchange() {
    let parts = vec![Ok(StreamPart::Text("Half".into())), Err("connection reset".into())];
    let mut widget = ChatWidget::new(MockTransport::replying(parts));
    let mut view = RecordingView::default();

    widget.set_input("hours?");
    let outcome = widget.submit(&mut view).await;

    assert!(matches!(outcome, SubmitOutcome::Failed(_)));
    assert_eq!(widget.messages()[2].content, "Half");

    // The widget accepts a new message afterwards.
    widget.set_input("still there?");
    assert!(widget.state.begin_submit().is_some());
}

#[tokio::test]
async fn stream_ending_without_finish_completes() {
    let parts = vec![Ok(StreamPart::Text("Short answer.".into()))];
    let mut widget = ChatWidget::new(MockTransport::replying(parts));
    let mut view = RecordingView::default();

    widget.set_input("q");
    assert!(matches!(widget.submit(&mut view).await, SubmitOutcome::Completed));
    assert_eq!(widget.messages()[2].content, "Short answer.");
}
