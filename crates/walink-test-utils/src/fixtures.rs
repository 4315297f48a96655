// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Raw message builders in the transport's wire shape.

use serde_json::{Value, json};
use walink_core::RawMessage;

pub const SENDER_JID: &str = "5511988887777@s.whatsapp.net";

/// A raw message with arbitrary content.
pub fn raw(id: &str, content: Value) -> RawMessage {
    RawMessage {
        id: Some(id.to_string()),
        remote_jid: SENDER_JID.to_string(),
        from_me: false,
        push_name: Some("Maria".to_string()),
        timestamp: Some(1_700_000_000),
        message: content,
    }
}

pub fn text(id: &str, body: &str) -> RawMessage {
    raw(id, json!({ "conversation": body }))
}

/// A message this identity sent itself.
pub fn echo(id: &str, body: &str) -> RawMessage {
    RawMessage {
        from_me: true,
        ..text(id, body)
    }
}

pub fn image(id: &str, caption: &str) -> RawMessage {
    raw(
        id,
        json!({
            "imageMessage": {
                "caption": caption,
                "mimetype": "image/jpeg",
                "url": "https://mmg.whatsapp.net/d/f/abc.enc",
                "fileLength": "52341"
            }
        }),
    )
}
