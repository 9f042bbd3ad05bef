use super::*;

fn chunk(value: serde_json::Value) -> SseEvent {
    SseEvent { event: None, data: value.to_string() }
}

#[test]
fn parse_text_chunks_then_finish() {
    let mut parser = GoogleEvents::default();
    let chunks = [
        chunk(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": "The Forge Pass" }] } }],
            "usageMetadata": { "promptTokenCount": 120 }
        })),
        chunk(serde_json::json!({
            "candidates": [{ "content": { "role": "model", "parts": [{ "text": " is $149/mo." }] }, "finishReason": "STOP" }],
            "usageMetadata": { "promptTokenCount": 120, "candidatesTokenCount": 9 }
        })),
    ];

    let out: Vec<StreamEvent> = chunks
        .iter()
        .flat_map(|c| parser.parse(c).unwrap())
        .collect();
    assert_eq!(
        out,
        vec![
            StreamEvent::Delta("The Forge Pass".into()),
            StreamEvent::Delta(" is $149/mo.".into()),
            StreamEvent::Finish { reason: FinishReason::Stop, usage: Usage { prompt_tokens: 120, completion_tokens: 9 } },
        ]
    );
}

#[test]
fn parse_skips_thought_parts() {
    let mut parser = GoogleEvents::default();
    let out = parser
        .parse(&chunk(serde_json::json!({
            "candidates": [{ "content": { "parts": [
                { "text": "planning...", "thought": true },
                { "text": "Come by anytime." }
            ] } }]
        })))
        .unwrap();
    assert_eq!(out, vec![StreamEvent::Delta("Come by anytime.".into())]);
}

#[test]
fn parse_max_tokens_maps_to_length() {
    let mut parser = GoogleEvents::default();
    let out = parser
        .parse(&chunk(serde_json::json!({
            "candidates": [{ "content": { "parts": [] }, "finishReason": "MAX_TOKENS" }]
        })))
        .unwrap();
    assert!(matches!(out.as_slice(), [StreamEvent::Finish { reason: FinishReason::Length, .. }]));
}

#[test]
fn parse_blocked_prompt_finishes_with_content_filter() {
    let mut parser = GoogleEvents::default();
    let out = parser
        .parse(&chunk(serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } })))
        .unwrap();
    assert!(matches!(out.as_slice(), [StreamEvent::Finish { reason: FinishReason::ContentFilter, .. }]));
}

#[test]
fn parse_error_payload() {
    let mut parser = GoogleEvents::default();
    let err = parser
        .parse(&chunk(serde_json::json!({ "error": { "code": 429, "message": "Resource exhausted" } })))
        .unwrap_err();
    assert!(matches!(err, LlmError::Stream(ref m) if m == "Resource exhausted"));
}

#[test]
fn parse_invalid_json() {
    let mut parser = GoogleEvents::default();
    let err = parser
        .parse(&SseEvent { event: None, data: "{".into() })
        .unwrap_err();
    assert!(matches!(err, LlmError::ApiParse(_)));
}

#[test]
fn finish_reason_mapping() {
    assert_eq!(map_finish_reason("STOP"), FinishReason::Stop);
    assert_eq!(map_finish_reason("SAFETY"), FinishReason::ContentFilter);
    assert_eq!(map_finish_reason("RECITATION"), FinishReason::ContentFilter);
    assert_eq!(map_finish_reason("MALFORMED_FUNCTION_CALL"), FinishReason::Other);
    assert_eq!(map_finish_reason("FINISH_REASON_UNSPECIFIED"), FinishReason::Unknown);
}

#[test]
fn request_maps_roles_and_system_instruction() {
    let messages = vec![Message::assistant("Welcome to Apex Forge."), Message::user("Any cold plunge?")];
    let body = serde_json::to_value(build_request(Some(256), "Be brief.", &messages)).unwrap();

    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "Be brief.");
    assert_eq!(body["contents"][0]["role"], "model");
    assert_eq!(body["contents"][1]["role"], "user");
    assert_eq!(body["contents"][1]["parts"][0]["text"], "Any cold plunge?");
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 256);
}

#[test]
fn request_omits_blank_system_instruction() {
    let messages = vec![Message::user("hi")];
    let body = serde_json::to_value(build_request(None, "", &messages)).unwrap();
    assert!(body.get("systemInstruction").is_none());
}

#[test]
fn request_without_cap_omits_generation_config() {
    let messages = vec![Message::user("What does the Forge Pass include?")];
    let body = serde_json::to_value(build_request(None, "Be brief.", &messages)).unwrap();
    assert!(body.get("generationConfig").is_none());
    assert!(!body.to_string().contains("maxOutputTokens"));
}
