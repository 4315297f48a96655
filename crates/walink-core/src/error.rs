// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for walink.

use thiserror::Error;

/// The primary error type used across walink adapter traits and core operations.
#[derive(Debug, Error)]
pub enum WalinkError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Session credentials could not be read, written, or removed.
    ///
    /// Fatal to the current connection attempt: losing a credential write
    /// forces a re-pairing on the next start.
    #[error("credential I/O error: {message}")]
    Credential {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The transport session could not be opened or controlled.
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A sink failed to accept an inbound message.
    #[error("sink '{sink}' delivery failed: {message}")]
    Sink { sink: String, message: String },

    /// An outbound send was rejected.
    #[error(transparent)]
    Send(#[from] SendError),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl WalinkError {
    /// Shorthand for a [`WalinkError::Credential`] wrapping an underlying error.
    pub fn credential(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Credential {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Shorthand for a [`WalinkError::Transport`] without an underlying error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }
}

/// Typed outcome of a rejected outbound send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The session is not open. Callers retry at their own layer.
    #[error("not connected")]
    NotConnected,

    /// The target could not be normalized to a transport address.
    #[error("invalid target: {0}")]
    InvalidTarget(String),

    /// The payload is empty (blank text, zero-byte media).
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// The transport accepted the request but failed to deliver it.
    #[error("transport failure: {0}")]
    TransportFailure(String),
}

/// How a transport-level send failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Network-level failure before the request left. Safe to retry once.
    Network,
    /// The remote service refused the message.
    Rejected,
    /// The session went away while the send was in flight.
    Closed,
    /// The request was handed over but no result came back in time. The
    /// message may have been delivered.
    Unconfirmed,
}

/// Error reported by [`crate::Transport::send_message`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Network,
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Rejected,
            message: message.into(),
        }
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Closed,
            message: message.into(),
        }
    }

    pub fn unconfirmed(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Unconfirmed,
            message: message.into(),
        }
    }

    /// Only network errors are retried; a rejected or interrupted send may
    /// already have reached the recipient.
    pub fn is_transient(&self) -> bool {
        self.kind == TransportErrorKind::Network
    }
}
