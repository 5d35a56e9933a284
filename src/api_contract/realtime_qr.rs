//! Wire contract for the QR hand-off between a desktop page and a mobile scanner.
//!
//! Every WebSocket frame is a JSON object `{"type": <event>, "payload": <data>}`.
//!
//! Desktop → Server:
//! `{"type": "registerDesktop", "payload": {"sessionId": "<id>"}}`
//!
//! Mobile → Server:
//! `{"type": "sendStudentQrData", "payload": {"sessionId": "<id>", "qrData": "<text>"}}`
//!
//! Server → Desktop: `desktopRegistered`, then `studentQrData` with the raw scanned text.
//! Server → Mobile: `dataForwarded` or `dataForwardFailed`.
//!
//! Error frames are flat: `{"type": "error", "code", "message", "timestamp"}`.

use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InitiateSessionResponse {
    pub session_id: String,
    pub mobile_scan_url: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterDesktopPayload {
    pub session_id: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendStudentQrDataPayload {
    pub session_id: String,
    pub qr_data: String,
}

/// Messages a client may send on the pairing socket.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    RegisterDesktop(RegisterDesktopPayload),
    SendStudentQrData(SendStudentQrDataPayload),
    Ping,
    Pong,
}

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Message is missing a string \"type\" field")]
    MissingType,
    #[error("Unknown message type: {0}")]
    UnknownMessageType(String),
    #[error("Invalid payload for {message_type}: {source}")]
    InvalidPayload {
        message_type: &'static str,
        source: serde_json::Error,
    },
    #[error("sessionId must not be empty")]
    EmptySessionId,
}

impl GatewayError {
    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidJson(_) => "invalid_json",
            GatewayError::MissingType => "missing_type",
            GatewayError::UnknownMessageType(_) => "unknown_message_type",
            GatewayError::InvalidPayload { .. } => "invalid_payload",
            GatewayError::EmptySessionId => "invalid_payload",
        }
    }
}

impl InboundEvent {
    pub fn parse(text: &str) -> Result<Self, GatewayError> {
        let mut parsed: JsonValue = serde_json::from_str(text)?;

        let message_type = parsed
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or(GatewayError::MissingType)?
            .to_string();

        let payload = parsed
            .get_mut("payload")
            .map(JsonValue::take)
            .unwrap_or(JsonValue::Null);

        match message_type.as_str() {
            "registerDesktop" => {
                let payload: RegisterDesktopPayload = serde_json::from_value(payload)
                    .map_err(|source| GatewayError::InvalidPayload {
                        message_type: "registerDesktop",
                        source,
                    })?;
                if payload.session_id.trim().is_empty() {
                    return Err(GatewayError::EmptySessionId);
                }
                Ok(InboundEvent::RegisterDesktop(payload))
            }
            "sendStudentQrData" => {
                let payload: SendStudentQrDataPayload = serde_json::from_value(payload)
                    .map_err(|source| GatewayError::InvalidPayload {
                        message_type: "sendStudentQrData",
                        source,
                    })?;
                if payload.session_id.trim().is_empty() {
                    return Err(GatewayError::EmptySessionId);
                }
                Ok(InboundEvent::SendStudentQrData(payload))
            }
            "ping" => Ok(InboundEvent::Ping),
            "pong" => Ok(InboundEvent::Pong),
            _ => Err(GatewayError::UnknownMessageType(message_type)),
        }
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DesktopRegisteredPayload {
    pub session_id: String,
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ForwardStatus {
    Success,
    Error,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ForwardResultPayload {
    pub status: ForwardStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Messages the server emits on the pairing socket.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundEvent {
    DesktopRegistered(DesktopRegisteredPayload),
    DataForwarded(ForwardResultPayload),
    DataForwardFailed(ForwardResultPayload),
    /// Raw scanned text, delivered to the desktop.
    StudentQrData(String),
    Pong,
    Error(ErrorPayload),
}

impl OutboundEvent {
    pub fn desktop_registered(session_id: &str) -> Self {
        OutboundEvent::DesktopRegistered(DesktopRegisteredPayload {
            session_id: session_id.to_string(),
        })
    }

    pub fn data_forwarded() -> Self {
        OutboundEvent::DataForwarded(ForwardResultPayload {
            status: ForwardStatus::Success,
            message: None,
        })
    }

    pub fn data_forward_failed(message: impl Into<String>) -> Self {
        OutboundEvent::DataForwardFailed(ForwardResultPayload {
            status: ForwardStatus::Error,
            message: Some(message.into()),
        })
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        OutboundEvent::Error(ErrorPayload {
            code: code.to_string(),
            message: message.into(),
            timestamp: chrono::Utc::now(),
        })
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            OutboundEvent::DesktopRegistered(_) => "desktopRegistered",
            OutboundEvent::DataForwarded(_) => "dataForwarded",
            OutboundEvent::DataForwardFailed(_) => "dataForwardFailed",
            OutboundEvent::StudentQrData(_) => "studentQrData",
            OutboundEvent::Pong => "pong",
            OutboundEvent::Error(_) => "error",
        }
    }
}

fn envelope<S, P>(serializer: S, event: &'static str, payload: Option<&P>) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    P: Serialize,
{
    let mut frame = serializer.serialize_struct("Frame", 1 + usize::from(payload.is_some()))?;
    frame.serialize_field("type", event)?;
    if let Some(payload) = payload {
        frame.serialize_field("payload", payload)?;
    }
    frame.end()
}

impl Serialize for OutboundEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let event = self.event_name();
        match self {
            OutboundEvent::DesktopRegistered(payload) => envelope(serializer, event, Some(payload)),
            OutboundEvent::DataForwarded(payload) | OutboundEvent::DataForwardFailed(payload) => {
                envelope(serializer, event, Some(payload))
            }
            OutboundEvent::StudentQrData(data) => envelope(serializer, event, Some(data)),
            OutboundEvent::Pong => envelope::<S, ()>(serializer, event, None),
            OutboundEvent::Error(payload) => {
                let mut frame = serializer.serialize_struct("ErrorFrame", 4)?;
                frame.serialize_field("type", event)?;
                frame.serialize_field("code", &payload.code)?;
                frame.serialize_field("message", &payload.message)?;
                frame.serialize_field("timestamp", &payload.timestamp)?;
                frame.end()
            }
        }
    }
}

impl From<&GatewayError> for OutboundEvent {
    fn from(err: &GatewayError) -> Self {
        OutboundEvent::error(err.code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_register_desktop() {
        let event = InboundEvent::parse(
            r#"{"type":"registerDesktop","payload":{"sessionId":"abc123"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::RegisterDesktop(RegisterDesktopPayload {
                session_id: "abc123".to_string()
            })
        );
    }

    #[test]
    fn test_parse_send_student_qr_data() {
        let event = InboundEvent::parse(
            r#"{"type":"sendStudentQrData","payload":{"sessionId":"abc123","qrData":"20210001"}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            InboundEvent::SendStudentQrData(SendStudentQrDataPayload {
                session_id: "abc123".to_string(),
                qr_data: "20210001".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_ping_without_payload() {
        assert_eq!(InboundEvent::parse(r#"{"type":"ping"}"#).unwrap(), InboundEvent::Ping);
    }

    #[test]
    fn test_parse_errors_carry_codes() {
        let cases = [
            ("not json", "invalid_json"),
            (r#"{"payload":{}}"#, "missing_type"),
            (r#"{"type":"subscribe"}"#, "unknown_message_type"),
            (r#"{"type":"registerDesktop","payload":{}}"#, "invalid_payload"),
            (r#"{"type":"sendStudentQrData","payload":{"sessionId":"x"}}"#, "invalid_payload"),
            (r#"{"type":"registerDesktop","payload":{"sessionId":"  "}}"#, "invalid_payload"),
        ];

        for (text, code) in cases {
            let err = InboundEvent::parse(text).unwrap_err();
            assert_eq!(err.code(), code, "input: {}", text);
        }
    }

    #[test]
    fn test_outbound_frames_use_type_payload_envelope() {
        let registered = serde_json::to_value(OutboundEvent::desktop_registered("abc123")).unwrap();
        assert_eq!(
            registered,
            json!({"type": "desktopRegistered", "payload": {"sessionId": "abc123"}})
        );

        let forwarded = serde_json::to_value(OutboundEvent::data_forwarded()).unwrap();
        assert_eq!(forwarded, json!({"type": "dataForwarded", "payload": {"status": "success"}}));

        let failed = serde_json::to_value(OutboundEvent::data_forward_failed("gone")).unwrap();
        assert_eq!(
            failed,
            json!({"type": "dataForwardFailed", "payload": {"status": "error", "message": "gone"}})
        );

        let data = serde_json::to_value(OutboundEvent::StudentQrData("20210001".to_string())).unwrap();
        assert_eq!(data, json!({"type": "studentQrData", "payload": "20210001"}));
    }

    #[test]
    fn test_error_frame_is_flat() {
        let timestamp = chrono::Utc::now();
        let frame = serde_json::to_value(OutboundEvent::Error(ErrorPayload {
            code: "invalid_json".to_string(),
            message: "Invalid JSON message".to_string(),
            timestamp,
        }))
        .unwrap();

        assert_eq!(
            frame,
            json!({
                "type": "error",
                "code": "invalid_json",
                "message": "Invalid JSON message",
                "timestamp": timestamp,
            })
        );
        assert!(frame.get("payload").is_none());
    }

    #[test]
    fn test_pong_has_no_payload() {
        let pong = serde_json::to_value(OutboundEvent::Pong).unwrap();
        assert_eq!(pong, json!({"type": "pong"}));
    }

    #[test]
    fn test_event_name_matches_serialized_type() {
        let events = [
            OutboundEvent::desktop_registered("s"),
            OutboundEvent::data_forwarded(),
            OutboundEvent::data_forward_failed("m"),
            OutboundEvent::StudentQrData("d".to_string()),
            OutboundEvent::Pong,
            OutboundEvent::error("invalid_json", "bad"),
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.event_name());
        }
    }
}
