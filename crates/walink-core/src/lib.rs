// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for walink.
//!
//! Holds the error taxonomy, the session data model and the adapter traits
//! that the transport, credential store and sinks implement.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{SendError, TransportError, TransportErrorKind, WalinkError};
pub use types::{
    AdapterType, CloseReason, ConnectionPhase, ConnectionState, ConnectionUpdate,
    CredentialDelta, Direction, HealthStatus, InboundMessage, MediaKind, MediaPayload, MediaRef,
    MessageId, MessageKind, OutboundPayload, OutboundRequest, RawMessage, SessionCredential,
    TransportEvent,
};

pub use traits::{CredentialStore, MessageSink, PluginAdapter, Transport};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const PHASES: [ConnectionPhase; 5] = [
        ConnectionPhase::Idle,
        ConnectionPhase::Pairing,
        ConnectionPhase::Open,
        ConnectionPhase::Closing,
        ConnectionPhase::Terminated,
    ];

    #[test]
    fn idle_cannot_jump_to_open() {
        assert!(!ConnectionPhase::Idle.can_transition_to(ConnectionPhase::Open));
        assert!(ConnectionPhase::Idle.can_transition_to(ConnectionPhase::Pairing));
        assert!(ConnectionPhase::Idle.can_transition_to(ConnectionPhase::Terminated));
        assert!(!ConnectionPhase::Idle.can_transition_to(ConnectionPhase::Closing));
    }

    #[test]
    fn terminated_only_leaves_to_idle() {
        for next in PHASES {
            let allowed = ConnectionPhase::Terminated.can_transition_to(next);
            assert_eq!(allowed, next == ConnectionPhase::Idle, "Terminated -> {next}");
        }
    }

    #[test]
    fn open_only_leaves_through_closing() {
        for next in PHASES {
            let allowed = ConnectionPhase::Open.can_transition_to(next);
            assert_eq!(allowed, next == ConnectionPhase::Closing, "Open -> {next}");
        }
    }

    #[test]
    fn phase_display_and_parse_round_trip() {
        use std::str::FromStr;
        for phase in PHASES {
            let s = phase.to_string();
            assert_eq!(s, s.to_lowercase());
            assert_eq!(ConnectionPhase::from_str(&s).unwrap(), phase);
        }
    }

    #[test]
    fn open_state_always_carries_device_number() {
        let state = ConnectionState::open("5511999990000");
        assert_eq!(state.phase(), ConnectionPhase::Open);
        assert_eq!(state.device_number(), Some("5511999990000"));
        assert!(state.pairing_code().is_none());
    }

    #[test]
    fn close_reason_maps_protocol_codes() {
        assert_eq!(CloseReason::from_status_code(401), CloseReason::LoggedOut);
        assert_eq!(CloseReason::from_status_code(515), CloseReason::RestartRequired);
        assert_eq!(CloseReason::from_status_code(428), CloseReason::ConnectionClosed);
        assert_eq!(CloseReason::from_status_code(999), CloseReason::Other(999));
        assert!(CloseReason::LoggedOut.is_logout());
        assert!(!CloseReason::ConnectionReplaced.is_logout());
        assert_eq!(CloseReason::Other(999).to_string(), "status_999");
    }

    #[test]
    fn credential_delta_upserts_and_removes() {
        let mut creds = SessionCredential::default();
        assert!(creds.is_empty());

        creds.apply(
            &CredentialDelta::default()
                .set("me", serde_json::json!({"id": "5511999990000:3@s.whatsapp.net"}))
                .set("registrationId", serde_json::json!(42)),
        );
        assert_eq!(creds.get("registrationId"), Some(&serde_json::json!(42)));

        creds.apply(&CredentialDelta::default().remove("registrationId"));
        assert!(creds.get("registrationId").is_none());
        assert!(creds.get("me").is_some());
    }

    #[test]
    fn credential_delta_null_means_delete() {
        let delta: CredentialDelta =
            serde_json::from_str(r#"{"a": 1, "b": null}"#).expect("valid delta");
        assert_eq!(delta.0.get("a"), Some(&Some(serde_json::json!(1))));
        assert_eq!(delta.0.get("b"), Some(&None));
    }

    #[test]
    fn raw_message_deserializes_wire_shape() {
        let raw: RawMessage = serde_json::from_value(serde_json::json!({
            "id": "ABC123",
            "remoteJid": "5511999990000@s.whatsapp.net",
            "fromMe": false,
            "pushName": "Ana",
            "messageTimestamp": 1_700_000_000,
            "message": {"conversation": "oi"}
        }))
        .expect("valid raw message");
        assert_eq!(raw.id.as_deref(), Some("ABC123"));
        assert_eq!(raw.timestamp, Some(1_700_000_000));
        assert_eq!(raw.message["conversation"], "oi");
    }

    #[test]
    fn sender_number_strips_suffix_and_device() {
        let msg = InboundMessage {
            id: MessageId("x".into()),
            remote_identity: "5511999990000:12@s.whatsapp.net".into(),
            sender_name: None,
            direction: Direction::Inbound,
            kind: MessageKind::Text,
            body: "hi".into(),
            media: None,
            timestamp: chrono::Utc::now(),
        };
        assert_eq!(msg.sender_number(), "5511999990000");
    }

    #[test]
    fn only_network_errors_are_transient() {
        assert!(TransportError::network("reset").is_transient());
        assert!(!TransportError::rejected("blocked").is_transient());
        assert!(!TransportError::closed("gone").is_transient());
        assert!(!TransportError::unconfirmed("no result").is_transient());
    }

    #[test]
    fn send_error_converts_into_walink_error() {
        let err: WalinkError = SendError::NotConnected.into();
        assert_eq!(err.to_string(), "not connected");
    }

    fn phase_strategy() -> impl Strategy<Value = ConnectionPhase> {
        prop::sample::select(PHASES.to_vec())
    }

    proptest! {
        // Every legal path from Idle reaches Open only through Pairing.
        #[test]
        fn open_is_only_reachable_from_pairing(walk in prop::collection::vec(phase_strategy(), 1..40)) {
            let mut current = ConnectionPhase::Idle;
            for next in walk {
                if current.can_transition_to(next) {
                    if next == ConnectionPhase::Open {
                        prop_assert_eq!(current, ConnectionPhase::Pairing);
                    }
                    current = next;
                }
            }
        }
    }
}
