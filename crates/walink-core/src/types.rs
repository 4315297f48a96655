// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the session, connection, relay and dispatch crates.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Transport-assigned identifier for a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the role an adapter plays.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Transport,
    CredentialStore,
    Sink,
    Observability,
}

// --- Connection lifecycle ---

/// Lifecycle phase of the single transport session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConnectionPhase {
    Idle,
    Pairing,
    Open,
    Closing,
    Terminated,
}

impl ConnectionPhase {
    /// Whether `self -> next` is an edge of the lifecycle graph.
    ///
    /// `Idle -> Terminated` exists only for an explicit logout while no
    /// session is live (before start or during reconnect backoff).
    /// Same-phase updates are not transitions and are handled separately.
    pub fn can_transition_to(self, next: ConnectionPhase) -> bool {
        use ConnectionPhase::*;
        matches!(
            (self, next),
            (Idle, Pairing)
                | (Idle, Terminated)
                | (Pairing, Open)
                | (Pairing, Idle)
                | (Pairing, Closing)
                | (Open, Closing)
                | (Closing, Idle)
                | (Closing, Terminated)
                | (Terminated, Idle)
        )
    }
}

/// Why a transport session ended.
///
/// Codes follow the multi-device protocol's disconnect statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseReason {
    /// The device was unlinked; credentials are no longer valid.
    LoggedOut,
    Forbidden,
    ConnectionLost,
    MultideviceMismatch,
    ConnectionClosed,
    ConnectionReplaced,
    BadSession,
    ServiceUnavailable,
    RestartRequired,
    /// No pairing happened before the configured deadline.
    PairingTimeout,
    /// The transport's event stream ended without a close event.
    TransportExited,
    /// Credentials could not be persisted.
    CredentialFailure,
    /// Local shutdown or logout request.
    LocalStop,
    Other(u16),
}

impl CloseReason {
    pub fn from_status_code(code: u16) -> Self {
        match code {
            401 => Self::LoggedOut,
            403 => Self::Forbidden,
            408 => Self::ConnectionLost,
            411 => Self::MultideviceMismatch,
            428 => Self::ConnectionClosed,
            440 => Self::ConnectionReplaced,
            500 => Self::BadSession,
            503 => Self::ServiceUnavailable,
            515 => Self::RestartRequired,
            other => Self::Other(other),
        }
    }

    /// An explicit logout ends the session for good.
    pub fn is_logout(self) -> bool {
        self == Self::LoggedOut
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LoggedOut => "logged_out",
            Self::Forbidden => "forbidden",
            Self::ConnectionLost => "connection_lost",
            Self::MultideviceMismatch => "multidevice_mismatch",
            Self::ConnectionClosed => "connection_closed",
            Self::ConnectionReplaced => "connection_replaced",
            Self::BadSession => "bad_session",
            Self::ServiceUnavailable => "service_unavailable",
            Self::RestartRequired => "restart_required",
            Self::PairingTimeout => "pairing_timeout",
            Self::TransportExited => "transport_exited",
            Self::CredentialFailure => "credential_failure",
            Self::LocalStop => "local_stop",
            Self::Other(code) => return write!(f, "status_{code}"),
        };
        f.write_str(s)
    }
}

/// Immutable snapshot of the connection lifecycle.
///
/// Fields are private so that the only way to build an `Open` state is
/// [`ConnectionState::open`], which requires the device number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionState {
    phase: ConnectionPhase,
    device_number: Option<String>,
    pairing_code: Option<String>,
    last_transition: DateTime<Utc>,
    last_close_reason: Option<CloseReason>,
    reconnect_attempt: u32,
}

impl ConnectionState {
    fn with_phase(phase: ConnectionPhase) -> Self {
        Self {
            phase,
            device_number: None,
            pairing_code: None,
            last_transition: Utc::now(),
            last_close_reason: None,
            reconnect_attempt: 0,
        }
    }

    pub fn idle() -> Self {
        Self::with_phase(ConnectionPhase::Idle)
    }

    pub fn pairing(pairing_code: Option<String>) -> Self {
        Self {
            pairing_code,
            ..Self::with_phase(ConnectionPhase::Pairing)
        }
    }

    pub fn open(device_number: impl Into<String>) -> Self {
        Self {
            device_number: Some(device_number.into()),
            ..Self::with_phase(ConnectionPhase::Open)
        }
    }

    pub fn closing(reason: CloseReason) -> Self {
        Self {
            last_close_reason: Some(reason),
            ..Self::with_phase(ConnectionPhase::Closing)
        }
    }

    pub fn terminated(reason: CloseReason) -> Self {
        Self {
            last_close_reason: Some(reason),
            ..Self::with_phase(ConnectionPhase::Terminated)
        }
    }

    /// Carry a close reason forward (e.g. into `Idle` after `Closing`).
    pub fn with_close_reason(mut self, reason: Option<CloseReason>) -> Self {
        self.last_close_reason = reason;
        self
    }

    pub fn with_reconnect_attempt(mut self, attempt: u32) -> Self {
        self.reconnect_attempt = attempt;
        self
    }

    /// Keep an earlier transition time when the phase has not changed.
    pub fn with_last_transition(mut self, at: DateTime<Utc>) -> Self {
        self.last_transition = at;
        self
    }

    pub fn phase(&self) -> ConnectionPhase {
        self.phase
    }

    pub fn device_number(&self) -> Option<&str> {
        self.device_number.as_deref()
    }

    pub fn pairing_code(&self) -> Option<&str> {
        self.pairing_code.as_deref()
    }

    pub fn last_transition(&self) -> DateTime<Utc> {
        self.last_transition
    }

    pub fn last_close_reason(&self) -> Option<CloseReason> {
        self.last_close_reason
    }

    pub fn reconnect_attempt(&self) -> u32 {
        self.reconnect_attempt
    }

    pub fn is_open(&self) -> bool {
        self.phase == ConnectionPhase::Open
    }
}

// --- Session credentials ---

/// Opaque authentication material for one device identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionCredential {
    entries: BTreeMap<String, serde_json::Value>,
}

impl SessionCredential {
    pub fn new(entries: BTreeMap<String, serde_json::Value>) -> Self {
        Self { entries }
    }

    /// An empty credential set means the device must pair first.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.entries
    }

    /// Merge an incremental update; `None` entries remove the key.
    pub fn apply(&mut self, delta: &CredentialDelta) {
        for (key, value) in &delta.0 {
            match value {
                Some(v) => {
                    self.entries.insert(key.clone(), v.clone());
                }
                None => {
                    self.entries.remove(key);
                }
            }
        }
    }
}

/// Incremental credential update emitted by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialDelta(pub BTreeMap<String, Option<serde_json::Value>>);

impl CredentialDelta {
    pub fn set(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), Some(value));
        self
    }

    pub fn remove(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// --- Transport events ---

/// Connection-level signal from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionUpdate {
    /// Socket is being established.
    Connecting,
    /// A (possibly rotated) pairing code is available for scanning.
    PairingCode(String),
    /// Handshake complete.
    Open { device_number: String },
    /// Session ended.
    Close { reason: CloseReason },
}

/// Everything a transport session can emit, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    CredentialsUpdated(CredentialDelta),
    Connection(ConnectionUpdate),
    Messages(Vec<RawMessage>),
}

/// One message as delivered by the transport, before classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub remote_jid: String,
    #[serde(default)]
    pub from_me: bool,
    #[serde(default)]
    pub push_name: Option<String>,
    /// Unix seconds.
    #[serde(default, rename = "messageTimestamp")]
    pub timestamp: Option<i64>,
    /// Content object keyed by marker (`conversation`, `imageMessage`, ...).
    #[serde(default)]
    pub message: serde_json::Value,
}

// --- Inbound messages ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Inbound,
    /// Sent by this identity and looped back by the transport.
    Echo,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Audio,
    Video,
    Document,
    Unknown,
}

/// Handle to a media payload; consumers download it themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mimetype: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// A classified inbound message. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InboundMessage {
    pub id: MessageId,
    pub remote_identity: String,
    pub sender_name: Option<String>,
    pub direction: Direction,
    pub kind: MessageKind,
    pub body: String,
    pub media: Option<MediaRef>,
    pub timestamp: DateTime<Utc>,
}

impl InboundMessage {
    /// The sender's number, i.e. the part of the JID before `@` and any `:device` suffix.
    pub fn sender_number(&self) -> &str {
        let user = self
            .remote_identity
            .split('@')
            .next()
            .unwrap_or(&self.remote_identity);
        user.split(':').next().unwrap_or(user)
    }
}

// --- Outbound ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    pub kind: MediaKind,
    pub bytes: Vec<u8>,
    pub mimetype: Option<String>,
    pub caption: Option<String>,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundPayload {
    Text(String),
    Media(MediaPayload),
}

impl OutboundPayload {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Media(m) => match m.kind {
                MediaKind::Image => "image",
                MediaKind::Audio => "audio",
                MediaKind::Video => "video",
                MediaKind::Document => "document",
            },
        }
    }
}

/// A send request as accepted by the dispatcher. Never persisted.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub target: String,
    pub payload: OutboundPayload,
    pub requested_at: DateTime<Utc>,
}
