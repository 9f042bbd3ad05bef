use super::*;

#[test]
fn message_without_id_gets_fresh_one() {
    let a: Message = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).expect("message");
    let b: Message = serde_json::from_str(r#"{"role":"user","content":"hi"}"#).expect("message");
    assert!(!a.id.is_empty());
    assert_ne!(a.id, b.id);
    assert_eq!(a.role, Role::User);
}

#[test]
fn message_ignores_extra_client_fields() {
    let json = r#"{"id":"7","role":"assistant","content":"yo","createdAt":"2024-01-01T00:00:00Z","parts":[]}"#;
    let msg: Message = serde_json::from_str(json).expect("message");
    assert_eq!(msg.id, "7");
    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.content, "yo");
}

#[test]
fn message_rejects_unknown_role() {
    let result = serde_json::from_str::<Message>(r#"{"role":"system","content":"x"}"#);
    assert!(result.is_err());
}

#[test]
fn role_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Role::Assistant).expect("role"), "\"assistant\"");
    assert_eq!(Role::User.as_str(), "user");
}

#[test]
fn encode_text_part_escapes_json() {
    let line = encode_part(&StreamPart::Text("say \"hi\"\n".to_owned()));
    assert_eq!(line, "0:\"say \\\"hi\\\"\\n\"\n");
}

#[test]
fn encode_finish_message_uses_camel_case() {
    let part = StreamPart::FinishMessage {
        finish_reason: FinishReason::Stop,
        usage: Usage { prompt_tokens: 12, completion_tokens: 3 },
    };
    let line = encode_part(&part);
    assert!(line.starts_with("d:{"));
    assert!(line.ends_with('\n'));
    assert!(line.contains("\"finishReason\":\"stop\""));
    assert!(line.contains("\"promptTokens\":12"));
    assert!(line.contains("\"completionTokens\":3"));
    assert_eq!(decode_part(line.trim_end()).expect("part"), part);
}

#[test]
fn encode_start_message() {
    let part = StreamPart::StartMessage { message_id: "msg-1".to_owned() };
    assert_eq!(encode_part(&part), "f:{\"messageId\":\"msg-1\"}\n");
}

#[test]
fn decode_finish_step_reads_content_filter() {
    let part = decode_part(
        r#"e:{"finishReason":"content-filter","usage":{"promptTokens":1,"completionTokens":2},"isContinued":false}"#,
    )
    .expect("part");
    assert_eq!(
        part,
        StreamPart::FinishStep {
            finish_reason: FinishReason::ContentFilter,
            usage: Usage { prompt_tokens: 1, completion_tokens: 2 },
            is_continued: false,
        }
    );
}

#[test]
fn decode_unrecognized_finish_reason_is_unknown() {
    let part = decode_part(r#"d:{"finishReason":"tool-calls"}"#).expect("part");
    assert_eq!(part, StreamPart::FinishMessage { finish_reason: FinishReason::Unknown, usage: Usage::default() });
}

#[test]
fn decode_unknown_code_keeps_payload() {
    let part = decode_part(r#"8:[{"note":1}]"#).expect("part");
    assert!(matches!(part, StreamPart::Unknown { ref code, .. } if code == "8"));
}

#[test]
fn decode_without_code_errors() {
    let err = decode_part("garbage").expect_err("no code");
    assert!(matches!(err, CodecError::MissingCode(_)));
}

#[test]
fn decode_text_with_bad_json_errors() {
    let err = decode_part("0:not-json").expect_err("payload");
    assert!(matches!(err, CodecError::Payload(_)));
}

#[test]
fn terminal_parts() {
    assert!(StreamPart::Error("x".to_owned()).is_terminal());
    assert!(
        StreamPart::FinishMessage { finish_reason: FinishReason::Stop, usage: Usage::default() }.is_terminal()
    );
    assert!(!StreamPart::Text("x".to_owned()).is_terminal());
}

#[test]
fn line_decoder_reassembles_split_lines() {
    let mut decoder = LineDecoder::default();
    assert!(decoder.push(b"0:\"Hel").is_empty());
    let parts = decoder.push(b"lo\"\n0:\" there\"\n3:");
    let parts: Vec<StreamPart> = parts.into_iter().map(|p| p.expect("part")).collect();
    assert_eq!(parts, vec![StreamPart::Text("Hello".to_owned()), StreamPart::Text(" there".to_owned())]);

    let rest = decoder.push(b"\"boom\"\n");
    assert_eq!(rest.len(), 1);
    assert_eq!(rest.into_iter().next().expect("one").expect("part"), StreamPart::Error("boom".to_owned()));
}

#[test]
fn line_decoder_handles_multibyte_split_and_crlf() {
    let line = "0:\"caf\u{e9}\"\r\n".as_bytes();
    let split = line.len() - 4;
    let mut decoder = LineDecoder::default();
    assert!(decoder.push(&line[..split]).is_empty());
    let parts = decoder.push(&line[split..]);
    assert_eq!(parts.len(), 1);
    assert_eq!(parts.into_iter().next().expect("one").expect("part"), StreamPart::Text("caf\u{e9}".to_owned()));
}

#[test]
fn line_decoder_skips_blank_lines_and_flushes_tail() {
    let mut decoder = LineDecoder::default();
    assert!(decoder.push(b"\n\n").is_empty());
    assert!(decoder.push(b"0:\"tail\"").is_empty());
    let tail = decoder.finish().expect("tail").expect("part");
    assert_eq!(tail, StreamPart::Text("tail".to_owned()));
    assert!(decoder.finish().is_none());
}
