// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use walink_config::model::StorageConfig;
use walink_core::{AdapterType, HealthStatus, MessageSink, PluginAdapter};
use walink_storage::{SqliteMessageLog, queries};
use walink_test_utils::fixtures;

fn inbound(id: &str) -> walink_core::InboundMessage {
    let raw = fixtures::image(id, "comprovante");
    walink_core::InboundMessage {
        id: walink_core::MessageId(id.to_string()),
        remote_identity: raw.remote_jid,
        sender_name: raw.push_name,
        direction: walink_core::Direction::Inbound,
        kind: walink_core::MessageKind::Image,
        body: "comprovante".to_string(),
        media: Some(walink_core::MediaRef {
            mimetype: Some("image/jpeg".into()),
            ..Default::default()
        }),
        timestamp: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
    }
}

#[tokio::test]
async fn open_creates_file_and_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("messages.db");
    let config = StorageConfig {
        enabled: true,
        database_path: path.to_string_lossy().into_owned(),
        wal_mode: true,
    };
    let log = SqliteMessageLog::open(&config).await.unwrap();
    assert!(path.exists());
    assert_eq!(log.adapter_type(), AdapterType::Sink);
    assert_eq!(log.health_check().await.unwrap(), HealthStatus::Healthy);
}

#[tokio::test]
async fn redelivery_is_idempotent_and_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StorageConfig {
        enabled: true,
        database_path: dir.path().join("m.db").to_string_lossy().into_owned(),
        wal_mode: true,
    };

    {
        let log = SqliteMessageLog::open(&config).await.unwrap();
        log.deliver(&inbound("WA1")).await.unwrap();
        log.deliver(&inbound("WA1")).await.unwrap();
        log.deliver(&inbound("WA2")).await.unwrap();
        log.shutdown().await.unwrap();
    }

    let log = SqliteMessageLog::open(&config).await.unwrap();
    assert_eq!(queries::count_messages(log.database()).await.unwrap(), 2);
    let recent = log.recent(10).await.unwrap();
    assert_eq!(recent[0].sender_number, "5511988887777");
    assert_eq!(recent[0].kind, "image");
    assert_eq!(recent[0].sent_at, "2023-11-14T22:13:20+00:00");
}
