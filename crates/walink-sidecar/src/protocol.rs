// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON-lines messages exchanged with the sidecar process.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use walink_core::{
    CloseReason, ConnectionUpdate, CredentialDelta, OutboundPayload, RawMessage,
    SessionCredential,
};

/// One line written to the sidecar's stdin.
#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostCommand<'a> {
    Open {
        credentials: &'a SessionCredential,
    },
    Send {
        request_id: String,
        to: &'a str,
        content: Value,
    },
    Logout,
    Close,
}

/// One line read from the sidecar's stdout.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SidecarEvent {
    Credentials {
        delta: CredentialDelta,
    },
    Connection {
        #[serde(default)]
        state: Option<String>,
        #[serde(default)]
        qr: Option<String>,
        #[serde(default)]
        number: Option<String>,
        #[serde(default)]
        status_code: Option<u16>,
    },
    Messages {
        messages: Vec<RawMessage>,
    },
    SendResult {
        request_id: String,
        ok: bool,
        #[serde(default)]
        message_id: Option<String>,
        #[serde(default)]
        error: Option<String>,
        #[serde(default)]
        transient: bool,
    },
}

/// Map a connection line onto a supervisor input.
///
/// A pairing code wins over the accompanying state; an `open` without a
/// number is meaningless and yields `None`.
pub fn connection_update(
    state: Option<&str>,
    qr: Option<String>,
    number: Option<String>,
    status_code: Option<u16>,
) -> Option<ConnectionUpdate> {
    if let Some(code) = qr.filter(|q| !q.is_empty()) {
        return Some(ConnectionUpdate::PairingCode(code));
    }
    match state? {
        "connecting" => Some(ConnectionUpdate::Connecting),
        "open" => number
            .filter(|n| !n.is_empty())
            .map(|device_number| ConnectionUpdate::Open { device_number }),
        "close" => Some(ConnectionUpdate::Close {
            reason: status_code
                .map(CloseReason::from_status_code)
                .unwrap_or(CloseReason::ConnectionClosed),
        }),
        _ => None,
    }
}

/// Wire form of an outbound payload. Media bytes travel base64-encoded.
pub fn content(payload: &OutboundPayload) -> Value {
    match payload {
        OutboundPayload::Text(text) => json!({ "type": "text", "text": text }),
        OutboundPayload::Media(media) => json!({
            "type": media.kind.to_string(),
            "data": STANDARD.encode(&media.bytes),
            "mimetype": media.mimetype,
            "caption": media.caption,
            "fileName": media.file_name,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use walink_core::{MediaKind, MediaPayload};

    #[test]
    fn parses_connection_lines() {
        let line = r#"{"event":"connection","state":"close","status_code":401}"#;
        let SidecarEvent::Connection {
            state,
            qr,
            number,
            status_code,
        } = serde_json::from_str(line).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(
            connection_update(state.as_deref(), qr, number, status_code),
            Some(ConnectionUpdate::Close {
                reason: CloseReason::LoggedOut
            })
        );
    }

    #[test]
    fn qr_wins_over_state() {
        assert_eq!(
            connection_update(Some("connecting"), Some("2@abc".into()), None, None),
            Some(ConnectionUpdate::PairingCode("2@abc".into()))
        );
        assert_eq!(
            connection_update(None, Some("2@abc".into()), None, None),
            Some(ConnectionUpdate::PairingCode("2@abc".into()))
        );
    }

    #[test]
    fn open_requires_number() {
        assert_eq!(connection_update(Some("open"), None, None, None), None);
        assert_eq!(
            connection_update(Some("open"), None, Some("5511999990000".into()), None),
            Some(ConnectionUpdate::Open {
                device_number: "5511999990000".into()
            })
        );
    }

    #[test]
    fn close_without_code_is_connection_closed() {
        assert_eq!(
            connection_update(Some("close"), None, None, None),
            Some(ConnectionUpdate::Close {
                reason: CloseReason::ConnectionClosed
            })
        );
        assert_eq!(connection_update(Some("weird"), None, None, None), None);
    }

    #[test]
    fn credential_nulls_are_deletions() {
        let line = r#"{"event":"credentials","delta":{"me":{"id":"1@s.whatsapp.net"},"pending":null}}"#;
        let SidecarEvent::Credentials { delta } = serde_json::from_str(line).unwrap() else {
            panic!("wrong variant");
        };
        assert!(delta.0["me"].is_some());
        assert!(delta.0["pending"].is_none());
    }

    #[test]
    fn send_command_shape() {
        let cmd = HostCommand::Send {
            request_id: "r1".into(),
            to: "5511988887777@s.whatsapp.net",
            content: content(&OutboundPayload::Text("oi".into())),
        };
        assert_eq!(
            serde_json::to_value(&cmd).unwrap(),
            json!({
                "op": "send",
                "request_id": "r1",
                "to": "5511988887777@s.whatsapp.net",
                "content": {"type": "text", "text": "oi"}
            })
        );
        assert_eq!(
            serde_json::to_value(HostCommand::Logout).unwrap(),
            json!({"op": "logout"})
        );
    }

    #[test]
    fn media_is_base64() {
        let value = content(&OutboundPayload::Media(MediaPayload {
            kind: MediaKind::Image,
            bytes: b"png!".to_vec(),
            mimetype: Some("image/png".into()),
            caption: Some("hi".into()),
            file_name: None,
        }));
        assert_eq!(value["type"], "image");
        assert_eq!(value["data"], "cG5nIQ==");
        assert_eq!(value["fileName"], Value::Null);
    }
}
