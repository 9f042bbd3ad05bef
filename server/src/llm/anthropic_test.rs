use super::*;

fn event(name: &str, data: serde_json::Value) -> SseEvent {
    SseEvent { event: Some(name.into()), data: data.to_string() }
}

fn run(events: &[SseEvent]) -> Vec<StreamEvent> {
    let mut parser = AnthropicEvents::default();
    events
        .iter()
        .flat_map(|e| parser.parse(e).unwrap())
        .collect()
}

#[test]
fn parse_text_stream() {
    let events = [
        event(
            "message_start",
            serde_json::json!({ "type": "message_start", "message": { "usage": { "input_tokens": 25, "output_tokens": 1 } } }),
        ),
        event("content_block_start", serde_json::json!({ "type": "content_block_start", "index": 0 })),
        event("ping", serde_json::json!({ "type": "ping" })),
        event(
            "content_block_delta",
            serde_json::json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": "Hello" } }),
        ),
        event(
            "content_block_delta",
            serde_json::json!({ "type": "content_block_delta", "index": 0, "delta": { "type": "text_delta", "text": " lifter" } }),
        ),
        event("content_block_stop", serde_json::json!({ "type": "content_block_stop", "index": 0 })),
        event(
            "message_delta",
            serde_json::json!({ "type": "message_delta", "delta": { "stop_reason": "end_turn" }, "usage": { "output_tokens": 15 } }),
        ),
        event("message_stop", serde_json::json!({ "type": "message_stop" })),
    ];

    let out = run(&events);
    assert_eq!(
        out,
        vec![
            StreamEvent::Delta("Hello".into()),
            StreamEvent::Delta(" lifter".into()),
            StreamEvent::Finish {
                reason: FinishReason::Stop,
                usage: Usage { prompt_tokens: 25, completion_tokens: 15 },
            },
        ]
    );
}

#[test]
fn parse_max_tokens_maps_to_length() {
    let events = [
        event(
            "message_delta",
            serde_json::json!({ "type": "message_delta", "delta": { "stop_reason": "max_tokens" }, "usage": { "output_tokens": 3 } }),
        ),
        event("message_stop", serde_json::json!({ "type": "message_stop" })),
    ];
    let out = run(&events);
    assert!(matches!(out.last(), Some(StreamEvent::Finish { reason: FinishReason::Length, .. })));
}

#[test]
fn parse_ignores_non_text_deltas() {
    let mut parser = AnthropicEvents::default();
    let out = parser
        .parse(&event(
            "content_block_delta",
            serde_json::json!({ "type": "content_block_delta", "delta": { "type": "input_json_delta", "partial_json": "{" } }),
        ))
        .unwrap();
    assert!(out.is_empty());
}

#[test]
fn parse_error_event() {
    let mut parser = AnthropicEvents::default();
    let err = parser
        .parse(&event(
            "error",
            serde_json::json!({ "type": "error", "error": { "type": "overloaded_error", "message": "Overloaded" } }),
        ))
        .unwrap_err();
    assert!(matches!(err, LlmError::Stream(ref m) if m == "Overloaded"));
}

#[test]
fn parse_invalid_json() {
    let mut parser = AnthropicEvents::default();
    let err = parser
        .parse(&SseEvent { event: None, data: "not json".into() })
        .unwrap_err();
    assert!(matches!(err, LlmError::ApiParse(_)));
}

#[test]
fn build_turns_skips_leading_greeting() {
    let messages = vec![
        Message::assistant("Welcome to Apex Forge."),
        Message::user("How much is the Forge Pass?"),
        Message::assistant("$149/mo."),
    ];
    let turns = build_turns(&messages);
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].role, "user");
    assert_eq!(turns[0].content, "How much is the Forge Pass?");
    assert_eq!(turns[1].role, "assistant");
}

#[test]
fn stop_reason_mapping() {
    assert_eq!(map_stop_reason(Some("stop_sequence")), FinishReason::Stop);
    assert_eq!(map_stop_reason(Some("refusal")), FinishReason::ContentFilter);
    assert_eq!(map_stop_reason(Some("pause_turn")), FinishReason::Other);
    assert_eq!(map_stop_reason(None), FinishReason::Unknown);
}
