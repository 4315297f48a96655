// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The external protocol session.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{TransportError, WalinkError};
use crate::traits::adapter::PluginAdapter;
use crate::types::{MessageId, OutboundPayload, SessionCredential, TransportEvent};

/// A live connection to the remote messaging service.
///
/// The protocol itself (encryption, multi-device sync) lives behind this
/// trait. Only one session is opened at a time; the supervisor guarantees it.
#[async_trait]
pub trait Transport: PluginAdapter {
    /// Opens a session with the given credentials and returns its event stream.
    ///
    /// Events arrive in the order the transport produced them. The stream
    /// ending without a `Close` event means the session was lost.
    async fn open(
        &self,
        credentials: SessionCredential,
    ) -> Result<mpsc::Receiver<TransportEvent>, WalinkError>;

    /// Sends a message to a fully-qualified address.
    async fn send_message(
        &self,
        target: &str,
        payload: &OutboundPayload,
    ) -> Result<MessageId, TransportError>;

    /// Unlinks the device on the remote side.
    async fn logout(&self) -> Result<(), WalinkError>;

    /// Releases the session without unlinking.
    async fn close(&self) -> Result<(), WalinkError>;
}
