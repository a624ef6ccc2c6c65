//! Client-facing wire schema
//!
//! Every message on the WebSocket is a tagged JSON object. Inbound kinds
//! form a closed set; a tag outside it deserializes to `Unknown` so the
//! dispatcher can log and ignore it instead of erroring the connection.

use crate::meter::{UsageRecord, UsageSummary};
use crate::session::billing::{round2, round4};
use serde::{Deserialize, Serialize};

/// Messages a client may send.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Start {
        #[serde(default)]
        config: Option<StartConfig>,
    },
    Audio {
        /// Base64-encoded audio bytes.
        data: String,
    },
    Stop,
    Ping,
    CostSummary,
    /// Any recognized-as-JSON message with an unknown `type` tag.
    #[serde(other)]
    Unknown,
}

/// Per-stream overrides supplied with `start`. Anything omitted falls back
/// to the server's recognition defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartConfig {
    pub language_code: Option<String>,
    pub alternative_language_codes: Option<Vec<String>>,
    pub interim_results: Option<bool>,
}

/// Messages the server sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Status {
        status: StatusKind,
        #[serde(rename = "clientId", default, skip_serializing_if = "Option::is_none")]
        client_id: Option<u64>,
    },
    Transcript {
        transcript: String,
        #[serde(rename = "isFinal")]
        is_final: bool,
        confidence: f32,
        #[serde(rename = "languageCode", default, skip_serializing_if = "Option::is_none")]
        language_code: Option<String>,
        cost: CostBreakdown,
    },
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<String>,
    },
    Pong,
    CostSummary {
        #[serde(rename = "totalRequests")]
        total_requests: u64,
        #[serde(rename = "totalAudioDurationSeconds")]
        total_audio_duration_seconds: f64,
        #[serde(rename = "totalCostUSD")]
        total_cost_usd: f64,
        #[serde(rename = "averageCostPerRequest")]
        average_cost_per_request: f64,
        #[serde(rename = "recentSessions")]
        recent_sessions: Vec<UsageRecord>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Connected,
    Started,
    Stopped,
}

/// Cost attribution attached to every relayed transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    #[serde(rename = "sessionDurationSeconds")]
    pub session_duration_seconds: f64,
    #[serde(rename = "sessionCostUSD")]
    pub session_cost_usd: f64,
    #[serde(rename = "totalCostUSD")]
    pub total_cost_usd: f64,
}

impl ServerMessage {
    pub fn connected(client_id: u64) -> Self {
        Self::Status {
            status: StatusKind::Connected,
            client_id: Some(client_id),
        }
    }

    pub fn started() -> Self {
        Self::Status {
            status: StatusKind::Started,
            client_id: None,
        }
    }

    pub fn stopped() -> Self {
        Self::Status {
            status: StatusKind::Stopped,
            client_id: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            code: None,
            details: None,
        }
    }

    /// Build a `cost_summary` reply from a meter snapshot, with display
    /// rounding applied.
    pub fn cost_summary(summary: &UsageSummary) -> Self {
        let totals = summary.totals;
        let average = if totals.requests > 0 {
            totals.cost_usd / totals.requests as f64
        } else {
            0.0
        };

        Self::CostSummary {
            total_requests: totals.requests,
            total_audio_duration_seconds: round2(totals.audio_duration_seconds),
            total_cost_usd: round4(totals.cost_usd),
            average_cost_per_request: round4(average),
            recent_sessions: summary.recent.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_with_config_parses() {
        let json = r#"{"type":"start","config":{"languageCode":"fr-FR","alternativeLanguageCodes":["en-US"]}}"#;
        match serde_json::from_str::<ClientMessage>(json).unwrap() {
            ClientMessage::Start { config: Some(cfg) } => {
                assert_eq!(cfg.language_code.as_deref(), Some("fr-FR"));
                assert_eq!(
                    cfg.alternative_language_codes,
                    Some(vec!["en-US".to_string()])
                );
                assert_eq!(cfg.interim_results, None);
            }
            other => panic!("unexpected parse: {other:?}"),
        }
    }

    #[test]
    fn start_without_config_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"type":"start"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Start { config: None }));
    }

    #[test]
    fn unknown_kind_is_not_an_error() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"reboot","anything":1}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Unknown));
    }

    #[test]
    fn audio_without_data_is_malformed() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"type":"audio"}"#).is_err());
    }

    #[test]
    fn missing_tag_is_malformed() {
        assert!(serde_json::from_str::<ClientMessage>(r#"{"data":"xyz"}"#).is_err());
    }

    #[test]
    fn connected_status_wire_shape() {
        let json = serde_json::to_string(&ServerMessage::connected(7)).unwrap();
        assert_eq!(json, r#"{"type":"status","status":"connected","clientId":7}"#);
    }

    #[test]
    fn started_status_omits_client_id() {
        let json = serde_json::to_string(&ServerMessage::started()).unwrap();
        assert_eq!(json, r#"{"type":"status","status":"started"}"#);
    }

    #[test]
    fn transcript_wire_shape() {
        let msg = ServerMessage::Transcript {
            transcript: "hello world".to_string(),
            is_final: true,
            confidence: 0.92,
            language_code: Some("en-US".to_string()),
            cost: CostBreakdown {
                session_duration_seconds: 3.0,
                session_cost_usd: 0.006,
                total_cost_usd: 0.006,
            },
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "transcript");
        assert_eq!(json["isFinal"], true);
        assert_eq!(json["cost"]["sessionDurationSeconds"], 3.0);
        assert_eq!(json["cost"]["sessionCostUSD"], 0.006);
        assert_eq!(json["cost"]["totalCostUSD"], 0.006);
    }

    #[test]
    fn cost_summary_averages_and_rounds() {
        use crate::meter::UsageMeter;

        let meter = UsageMeter::new();
        meter.record(1, 1.0, 0.006, "a");
        meter.record(1, 2.0, 0.006, "b");

        match ServerMessage::cost_summary(&meter.summary()) {
            ServerMessage::CostSummary {
                total_requests,
                total_audio_duration_seconds,
                total_cost_usd,
                average_cost_per_request,
                recent_sessions,
            } => {
                assert_eq!(total_requests, 2);
                assert_eq!(total_audio_duration_seconds, 3.0);
                assert_eq!(total_cost_usd, 0.012);
                assert_eq!(average_cost_per_request, 0.006);
                assert_eq!(recent_sessions.len(), 2);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn cost_summary_empty_meter_has_zero_average() {
        use crate::meter::UsageMeter;

        let meter = UsageMeter::new();
        match ServerMessage::cost_summary(&meter.summary()) {
            ServerMessage::CostSummary {
                total_requests,
                average_cost_per_request,
                ..
            } => {
                assert_eq!(total_requests, 0);
                assert_eq!(average_cost_per_request, 0.0);
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
