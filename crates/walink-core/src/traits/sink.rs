// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Downstream consumers of inbound messages.

use async_trait::async_trait;

use crate::error::WalinkError;
use crate::traits::adapter::PluginAdapter;
use crate::types::InboundMessage;

/// Receives classified inbound messages (webhook, message log, ...).
///
/// A failing sink never affects other sinks or the transport; the relay
/// bounds every call with a timeout and may retry with the same message.
#[async_trait]
pub trait MessageSink: PluginAdapter {
    async fn deliver(&self, message: &InboundMessage) -> Result<(), WalinkError>;
}
