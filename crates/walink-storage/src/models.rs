// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use walink_core::{InboundMessage, MediaRef};

/// A row of the `inbound_messages` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: String,
    pub remote_identity: String,
    pub sender_number: String,
    pub sender_name: Option<String>,
    pub kind: String,
    pub body: String,
    pub media: Option<MediaRef>,
    /// RFC 3339 timestamp reported by the sender.
    pub sent_at: String,
    /// RFC 3339 timestamp of when the row was written.
    pub received_at: String,
}

impl StoredMessage {
    pub fn from_inbound(message: &InboundMessage, received_at: String) -> Self {
        Self {
            id: message.id.0.clone(),
            remote_identity: message.remote_identity.clone(),
            sender_number: message.sender_number().to_string(),
            sender_name: message.sender_name.clone(),
            kind: message.kind.to_string(),
            body: message.body.clone(),
            media: message.media.clone(),
            sent_at: message.timestamp.to_rfc3339(),
            received_at,
        }
    }
}
