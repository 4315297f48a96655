// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message log queries.

use rusqlite::params;
use walink_core::WalinkError;

use crate::database::{Database, map_tr_err};
use crate::models::StoredMessage;

/// Insert a message unless its id is already stored.
///
/// Returns `true` if a row was written.
pub async fn insert_message(db: &Database, msg: &StoredMessage) -> Result<bool, WalinkError> {
    let media = match &msg.media {
        Some(media) => Some(serde_json::to_string(media).map_err(|e| WalinkError::Storage {
            source: Box::new(e),
        })?),
        None => None,
    };
    let msg = msg.clone();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO inbound_messages
                 (id, remote_identity, sender_number, sender_name, kind, body, media, sent_at, received_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    msg.id,
                    msg.remote_identity,
                    msg.sender_number,
                    msg.sender_name,
                    msg.kind,
                    msg.body,
                    media,
                    msg.sent_at,
                    msg.received_at,
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// The most recent messages, newest first.
pub async fn list_recent(db: &Database, limit: i64) -> Result<Vec<StoredMessage>, WalinkError> {
    db.connection()
        .call(move |conn| -> Result<Vec<StoredMessage>, rusqlite::Error> {
            let mut stmt = conn.prepare(
                "SELECT id, remote_identity, sender_number, sender_name, kind, body, media, sent_at, received_at
                 FROM inbound_messages
                 ORDER BY sent_at DESC, received_at DESC
                 LIMIT ?1",
            )?;
            let rows = stmt.query_map(params![limit], |row| {
                let media: Option<String> = row.get(6)?;
                Ok(StoredMessage {
                    id: row.get(0)?,
                    remote_identity: row.get(1)?,
                    sender_number: row.get(2)?,
                    sender_name: row.get(3)?,
                    kind: row.get(4)?,
                    body: row.get(5)?,
                    // Unparseable media JSON reads as absent rather than failing the page.
                    media: media.and_then(|m| serde_json::from_str(&m).ok()),
                    sent_at: row.get(7)?,
                    received_at: row.get(8)?,
                })
            })?;
            let messages = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn count_messages(db: &Database) -> Result<i64, WalinkError> {
    db.connection()
        .call(|conn| -> Result<i64, rusqlite::Error> {
            conn.query_row("SELECT COUNT(*) FROM inbound_messages", [], |row| row.get(0))
        })
        .await
        .map_err(map_tr_err)
}
