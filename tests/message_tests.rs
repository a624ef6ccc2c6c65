//! Wire-shape tests for the relay protocol from the public API.

use serde_json::{json, Value};
use stt_relay::{ClientMessage, CostBreakdown, ServerMessage, UsageMeter};

#[test]
fn inbound_kinds_parse() {
    for (raw, expect_start) in [
        (r#"{"type":"start"}"#, true),
        (r#"{"type":"start","config":{"languageCode":"hi-IN","interimResults":true}}"#, true),
        (r#"{"type":"stop"}"#, false),
    ] {
        let msg: ClientMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(matches!(msg, ClientMessage::Start { .. }), expect_start);
    }

    assert!(matches!(
        serde_json::from_str::<ClientMessage>(r#"{"type":"ping"}"#).unwrap(),
        ClientMessage::Ping
    ));
    assert!(matches!(
        serde_json::from_str::<ClientMessage>(r#"{"type":"cost_summary"}"#).unwrap(),
        ClientMessage::CostSummary
    ));
}

#[test]
fn unknown_inbound_kind_parses_as_unknown() {
    let msg: ClientMessage =
        serde_json::from_str(r#"{"type":"resume","sessionId":"x"}"#).unwrap();
    assert!(matches!(msg, ClientMessage::Unknown));
}

#[test]
fn transcript_omits_absent_language_code() {
    let msg = ServerMessage::Transcript {
        transcript: "hi".to_string(),
        is_final: true,
        confidence: 0.5,
        language_code: None,
        cost: CostBreakdown {
            session_duration_seconds: 1.0,
            session_cost_usd: 0.006,
            total_cost_usd: 0.006,
        },
    };
    let value = serde_json::to_value(&msg).unwrap();
    assert!(value.get("languageCode").is_none());
}

#[test]
fn error_omits_absent_code_and_details() {
    let value = serde_json::to_value(ServerMessage::error("boom")).unwrap();
    assert_eq!(value, json!({"type": "error", "message": "boom"}));
}

#[test]
fn usage_records_serialize_with_original_field_names() {
    let meter = UsageMeter::new();
    meter.record(3, 2.5, 0.006, "quarterly numbers look fine");

    let summary = ServerMessage::cost_summary(&meter.summary());
    let value = serde_json::to_value(&summary).unwrap();

    let record: &Value = &value["recentSessions"][0];
    assert_eq!(record["clientId"], 3);
    assert_eq!(record["durationSeconds"], 2.5);
    assert_eq!(record["costUSD"], 0.006);
    assert_eq!(record["transcript"], "quarterly numbers look fine");
    // RFC3339 timestamp.
    let ts = record["timestamp"].as_str().unwrap();
    assert!(ts.contains('T'));
}

#[test]
fn pong_wire_shape() {
    assert_eq!(
        serde_json::to_string(&ServerMessage::Pong).unwrap(),
        r#"{"type":"pong"}"#
    );
}
