// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turning raw transport messages into [`InboundMessage`]s.

use chrono::{DateTime, Utc};
use serde_json::Value;
use walink_core::{Direction, InboundMessage, MediaRef, MessageId, MessageKind, RawMessage};

/// Markers whose payload is another message under `message`.
const WRAPPERS: [&str; 4] = [
    "ephemeralMessage",
    "viewOnceMessage",
    "viewOnceMessageV2",
    "documentWithCaptionMessage",
];

/// Markers that ride along with real content and carry none themselves.
const METADATA_MARKERS: [&str; 2] = ["messageContextInfo", "senderKeyDistributionMessage"];

const MAX_UNWRAP_DEPTH: usize = 4;

/// Strip wrapper envelopes until the real content object is reached.
pub fn unwrap_content(mut content: &Value) -> &Value {
    for _ in 0..MAX_UNWRAP_DEPTH {
        let inner = WRAPPERS
            .iter()
            .find_map(|marker| content.get(*marker)?.get("message"));
        match inner {
            Some(inner) => content = inner,
            None => break,
        }
    }
    content
}

/// Kind, body and media handle for a content object, by marker priority.
pub fn classify(content: &Value) -> (MessageKind, String, Option<MediaRef>) {
    let content = unwrap_content(content);

    if let Some(text) = content.get("conversation").and_then(Value::as_str) {
        return (MessageKind::Text, text.to_string(), None);
    }
    if let Some(ext) = content.get("extendedTextMessage") {
        return (MessageKind::Text, str_field(ext, "text"), None);
    }

    let media_markers = [
        ("imageMessage", MessageKind::Image),
        ("audioMessage", MessageKind::Audio),
        ("videoMessage", MessageKind::Video),
        ("documentMessage", MessageKind::Document),
    ];
    for (marker, kind) in media_markers {
        if let Some(media) = content.get(marker) {
            return (kind, str_field(media, "caption"), Some(media_ref(media)));
        }
    }

    let marker = content.as_object().and_then(|fields| {
        fields
            .keys()
            .find(|k| !METADATA_MARKERS.contains(&k.as_str()))
            .cloned()
    });
    let body = match marker {
        Some(marker) => format!("[unsupported message: {marker}]"),
        None => "[empty message]".to_string(),
    };
    (MessageKind::Unknown, body, None)
}

/// Build the immutable message for a raw event that already has an id.
pub fn build(id: &str, raw: &RawMessage) -> InboundMessage {
    let (kind, body, media) = classify(&raw.message);
    InboundMessage {
        id: MessageId(id.to_string()),
        remote_identity: raw.remote_jid.clone(),
        sender_name: raw.push_name.clone().filter(|n| !n.is_empty()),
        direction: if raw.from_me {
            Direction::Echo
        } else {
            Direction::Inbound
        },
        kind,
        body,
        media,
        timestamp: raw
            .timestamp
            .and_then(|secs| DateTime::from_timestamp(secs, 0))
            .unwrap_or_else(Utc::now),
    }
}

fn str_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn media_ref(media: &Value) -> MediaRef {
    let text = |key: &str| media.get(key).and_then(Value::as_str).map(str::to_string);
    // Protobuf longs arrive as either numbers or decimal strings.
    let size = match media.get("fileLength") {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.parse().ok(),
        _ => None,
    };
    MediaRef {
        mimetype: text("mimetype"),
        url: text("url"),
        file_name: text("fileName"),
        size,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversation_is_text() {
        let (kind, body, media) = classify(&json!({"conversation": "oi"}));
        assert_eq!(kind, MessageKind::Text);
        assert_eq!(body, "oi");
        assert!(media.is_none());
    }

    #[test]
    fn extended_text_is_text() {
        let (kind, body, _) = classify(&json!({
            "extendedTextMessage": {"text": "see https://example.com", "matchedText": "https://example.com"}
        }));
        assert_eq!(kind, MessageKind::Text);
        assert_eq!(body, "see https://example.com");
    }

    #[test]
    fn text_marker_wins_over_media_marker() {
        let (kind, body, _) = classify(&json!({
            "imageMessage": {"caption": "ignored"},
            "conversation": "first"
        }));
        assert_eq!(kind, MessageKind::Text);
        assert_eq!(body, "first");
    }

    #[test]
    fn image_carries_caption_and_media_ref() {
        let (kind, body, media) = classify(&json!({
            "imageMessage": {
                "caption": "look",
                "mimetype": "image/jpeg",
                "url": "https://mmg.whatsapp.net/x.enc",
                "fileLength": "52341"
            }
        }));
        assert_eq!(kind, MessageKind::Image);
        assert_eq!(body, "look");
        let media = media.unwrap();
        assert_eq!(media.mimetype.as_deref(), Some("image/jpeg"));
        assert_eq!(media.size, Some(52_341));
    }

    #[test]
    fn audio_without_caption_has_empty_body() {
        let (kind, body, media) =
            classify(&json!({"audioMessage": {"mimetype": "audio/ogg; codecs=opus", "fileLength": 4096}}));
        assert_eq!(kind, MessageKind::Audio);
        assert_eq!(body, "");
        assert_eq!(media.unwrap().size, Some(4096));
    }

    #[test]
    fn document_keeps_file_name() {
        let (kind, _, media) = classify(&json!({
            "documentMessage": {"fileName": "boleto.pdf", "mimetype": "application/pdf"}
        }));
        assert_eq!(kind, MessageKind::Document);
        assert_eq!(media.unwrap().file_name.as_deref(), Some("boleto.pdf"));
    }

    #[test]
    fn wrappers_are_unwrapped() {
        let (kind, body, _) = classify(&json!({
            "ephemeralMessage": {"message": {
                "viewOnceMessageV2": {"message": {"videoMessage": {"caption": "once"}}}
            }}
        }));
        assert_eq!(kind, MessageKind::Video);
        assert_eq!(body, "once");

        let (kind, body, _) = classify(&json!({
            "documentWithCaptionMessage": {"message": {"documentMessage": {"caption": "nf"}}}
        }));
        assert_eq!(kind, MessageKind::Document);
        assert_eq!(body, "nf");
    }

    #[test]
    fn unknown_marker_gets_placeholder() {
        let (kind, body, media) = classify(&json!({
            "messageContextInfo": {},
            "stickerMessage": {"mimetype": "image/webp"}
        }));
        assert_eq!(kind, MessageKind::Unknown);
        assert_eq!(body, "[unsupported message: stickerMessage]");
        assert!(media.is_none());
    }

    #[test]
    fn empty_content_gets_placeholder() {
        assert_eq!(classify(&Value::Null).1, "[empty message]");
        assert_eq!(classify(&json!({})).1, "[empty message]");
        assert_eq!(classify(&json!({"messageContextInfo": {}})).1, "[empty message]");
    }

    #[test]
    fn build_maps_direction_and_timestamp() {
        let raw = RawMessage {
            id: Some("ID1".into()),
            remote_jid: "5511988887777@s.whatsapp.net".into(),
            from_me: true,
            push_name: Some(String::new()),
            timestamp: Some(1_700_000_000),
            message: json!({"conversation": "eu"}),
        };
        let msg = build("ID1", &raw);
        assert_eq!(msg.direction, Direction::Echo);
        assert_eq!(msg.timestamp.timestamp(), 1_700_000_000);
        assert!(msg.sender_name.is_none());
        assert_eq!(msg.sender_number(), "5511988887777");
    }
}
