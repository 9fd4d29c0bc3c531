#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Edge-case tests for the envelope validator, line codec and dispatcher
//! Covers boundary conditions, malformed input and error mapping

use bytes::BytesMut;
use rpc_relay::core::{Frame, LineCodec};
use rpc_relay::error::{codes, TransportError};
use rpc_relay::protocol::{decode, validate, Dispatcher, ErrorObject, Message, MessageKind, RequestId};
use serde_json::json;
use tokio_util::codec::Decoder;

fn reason(err: TransportError) -> String {
    match err {
        TransportError::InvalidFormat(reason) => reason,
        other => panic!("expected InvalidFormat, got {other:?}"),
    }
}

// ============================================================================
// VALIDATOR EDGE CASES
// ============================================================================

#[test]
fn test_non_utf8_rejected() {
    let err = decode(&[0xFF, 0xFE, b'{', b'}']).unwrap_err();
    assert!(err.is_parse_error());
    assert!(reason(err).starts_with("Message is not valid UTF-8"));
}

#[test]
fn test_truncated_json_rejected() {
    let err = decode(br#"{"jsonrpc":"2.0","id":1,"method":"x""#).unwrap_err();
    assert!(err.is_parse_error());
    assert_eq!(err.to_error_object().code, codes::PARSE_ERROR);
}

#[test]
fn test_non_object_roots_rejected() {
    for input in [&b"[]"[..], b"42", b"\"text\"", b"null", b"true"] {
        let err = decode(input).unwrap_err();
        assert!(!err.is_parse_error(), "{input:?} is valid JSON");
        assert_eq!(err.to_error_object().code, codes::INVALID_REQUEST);
    }
}

#[test]
fn test_missing_or_wrong_version() {
    assert!(decode(br#"{"id":1,"method":"x"}"#).is_err());
    assert!(decode(br#"{"jsonrpc":"1.0","id":1,"method":"x"}"#).is_err());
    assert!(decode(br#"{"jsonrpc":2.0,"id":1,"method":"x"}"#).is_err());
}

#[test]
fn test_null_and_structured_ids_rejected() {
    for id in ["null", "true", "[1]", "{\"a\":1}"] {
        let raw = format!(r#"{{"jsonrpc":"2.0","id":{id},"method":"x"}}"#);
        let err = decode(raw.as_bytes()).unwrap_err();
        assert!(reason(err).contains("id must be a number or string"));
    }
}

#[test]
fn test_fractional_and_large_ids_preserved() {
    let msg = decode(br#"{"jsonrpc":"2.0","id":1.5,"method":"x"}"#).unwrap();
    assert_eq!(msg.to_json().unwrap(), r#"{"jsonrpc":"2.0","id":1.5,"method":"x"}"#);

    let msg = decode(br#"{"jsonrpc":"2.0","id":18446744073709551615,"method":"x"}"#).unwrap();
    assert!(msg.to_json().unwrap().contains("18446744073709551615"));
}

#[test]
fn test_params_must_be_object() {
    let err = decode(br#"{"jsonrpc":"2.0","id":1,"method":"x","params":[1,2]}"#).unwrap_err();
    assert!(reason(err).contains("params must be an object"));
}

#[test]
fn test_method_must_be_string() {
    let err = decode(br#"{"jsonrpc":"2.0","id":1,"method":7}"#).unwrap_err();
    assert!(reason(err).contains("method must be a string"));
}

#[test]
fn test_error_object_shape() {
    assert!(decode(br#"{"jsonrpc":"2.0","id":1,"error":{"code":-1,"message":"m"}}"#).is_ok());
    assert!(decode(br#"{"jsonrpc":"2.0","id":1,"error":{"code":"x","message":"m"}}"#).is_err());
    assert!(decode(br#"{"jsonrpc":"2.0","id":1,"error":{"code":-1}}"#).is_err());
    assert!(decode(br#"{"jsonrpc":"2.0","id":1,"error":"bad"}"#).is_err());
}

#[test]
fn test_error_codes_accept_any_number() {
    let msg = decode(br#"{"jsonrpc":"2.0","id":1,"error":{"code":-3.2e4,"message":"m"}}"#).unwrap();
    let code = msg.error.unwrap().code;
    assert_eq!(code, -32000i64);
    assert_eq!(code.to_string(), "-32000.0");

    let msg = decode(br#"{"jsonrpc":"2.0","id":1,"error":{"code":1.5,"message":"m"}}"#).unwrap();
    let error = msg.error.unwrap();
    assert_eq!(error.code.as_i64(), None);
    assert_eq!(error.code.to_string(), "1.5");
    let echoed = Message::error_response(Some(RequestId::from(1)), error);
    assert_eq!(
        echoed.to_json().unwrap(),
        r#"{"jsonrpc":"2.0","id":1,"error":{"code":1.5,"message":"m"}}"#
    );
}

#[test]
fn test_shape_exclusivity() {
    assert!(decode(br#"{"jsonrpc":"2.0","id":1}"#).is_err());
    assert!(decode(br#"{"jsonrpc":"2.0","id":1,"method":"x","result":1}"#).is_err());
    assert!(
        decode(br#"{"jsonrpc":"2.0","id":1,"result":1,"error":{"code":1,"message":"m"}}"#)
            .is_err()
    );
}

#[test]
fn test_null_result_is_a_response() {
    let msg = decode(br#"{"jsonrpc":"2.0","id":1,"result":null}"#).unwrap();
    assert_eq!(msg.kind(), MessageKind::Response);
    assert_eq!(msg.result, Some(serde_json::Value::Null));
    assert_eq!(msg.to_json().unwrap(), r#"{"jsonrpc":"2.0","id":1,"result":null}"#);
}

#[test]
fn test_unknown_fields_ignored() {
    let msg = decode(br#"{"jsonrpc":"2.0","method":"x","trace":"abc"}"#).unwrap();
    assert_eq!(msg.kind(), MessageKind::Notification);
    assert!(!msg.to_json().unwrap().contains("trace"));
}

#[test]
fn test_validate_leaves_input_untouched() {
    let raw = json!({"jsonrpc": "2.0", "id": "a", "method": "x", "extra": [1, 2]});
    let before = raw.clone();
    validate(&raw).unwrap();
    assert_eq!(raw, before);
}

#[test]
fn test_deserialize_goes_through_validation() {
    let ok: Message = serde_json::from_str(r#"{"jsonrpc":"2.0","id":"k","method":"m"}"#).unwrap();
    assert_eq!(ok.id, Some(RequestId::from("k")));

    let bad: Result<Message, _> = serde_json::from_str(r#"{"jsonrpc":"2.0","id":null,"method":"m"}"#);
    assert!(bad.is_err());
}

// ============================================================================
// CODEC EDGE CASES
// ============================================================================

#[test]
fn test_codec_empty_input() {
    let mut codec = LineCodec::new(16);
    let mut buf = BytesMut::new();
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
    assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
}

#[test]
fn test_codec_only_newlines() {
    let mut codec = LineCodec::new(16);
    let mut buf = BytesMut::from(&b"\n\n\r\n\n"[..]);
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
    assert_eq!(codec.decode_eof(&mut buf).unwrap(), None);
}

#[test]
fn test_codec_multibyte_utf8_split_across_reads() {
    let text = "{\"q\":\"héllo ✓\"}\n".as_bytes();
    let mut codec = LineCodec::new(64);
    let mut buf = BytesMut::new();
    for byte in text {
        buf.extend_from_slice(&[*byte]);
        if let Some(frame) = codec.decode(&mut buf).unwrap() {
            assert_eq!(frame, Frame::Line(bytes::Bytes::copy_from_slice(&text[..text.len() - 1])));
            return;
        }
    }
    panic!("line never completed");
}

#[test]
fn test_codec_recovers_after_oversized_line() {
    let mut codec = LineCodec::new(4);
    let mut buf = BytesMut::from(&b"toolong\nok\n"[..]);
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(Frame::Oversized(7)));
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(Frame::Line(bytes::Bytes::from_static(b"ok")))
    );
}

// ============================================================================
// DISPATCHER EDGE CASES
// ============================================================================

#[tokio::test]
async fn test_reregister_replaces_handler() {
    let dispatcher = Dispatcher::new();
    dispatcher.register("v", |_m: Message| async { Ok(json!(1)) }).unwrap();
    dispatcher.register("v", |_m: Message| async { Ok(json!(2)) }).unwrap();
    assert_eq!(dispatcher.methods(), vec!["v".to_string()]);

    let reply = dispatcher
        .dispatch(Message::request(1, "v", None))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply.result, Some(json!(2)));
}

#[tokio::test]
async fn test_handler_error_object_passed_through() {
    let dispatcher = Dispatcher::new();
    dispatcher
        .register("strict", |_m: Message| async {
            Err(ErrorObject::with_data(-32050, "custom", json!({"hint": "retry"})))
        })
        .unwrap();

    let reply = dispatcher
        .dispatch(Message::request("r", "strict", None))
        .await
        .unwrap()
        .unwrap();
    let error = reply.error.unwrap();
    assert_eq!(error.code, -32050i64);
    assert_eq!(error.data, Some(json!({"hint": "retry"})));
    assert_eq!(reply.id, Some(RequestId::from("r")));
}

#[tokio::test]
async fn test_unknown_notification_is_silent() {
    let dispatcher = Dispatcher::new();
    let reply = dispatcher
        .dispatch(Message::notification("nobody", None))
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_inbound_responses_ignored() {
    let dispatcher = Dispatcher::new();
    let reply = dispatcher
        .dispatch(Message::response(3, json!("late")))
        .await
        .unwrap();
    assert!(reply.is_none());
}
