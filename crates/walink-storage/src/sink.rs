// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite message log as a relay sink.

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use walink_config::model::StorageConfig;
use walink_core::{
    AdapterType, HealthStatus, InboundMessage, MessageSink, PluginAdapter, WalinkError,
};

use crate::database::{Database, map_tr_err};
use crate::models::StoredMessage;
use crate::queries;

/// Appends every relayed message to `inbound_messages`.
///
/// Re-delivery of an id already stored is a no-op, so relay retries are safe.
#[derive(Debug, Clone)]
pub struct SqliteMessageLog {
    db: Database,
}

impl SqliteMessageLog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn open(config: &StorageConfig) -> Result<Self, WalinkError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        Ok(Self::new(db))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn recent(&self, limit: i64) -> Result<Vec<StoredMessage>, WalinkError> {
        queries::list_recent(&self.db, limit).await
    }
}

#[async_trait]
impl PluginAdapter for SqliteMessageLog {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Sink
    }

    async fn health_check(&self) -> Result<HealthStatus, WalinkError> {
        self.db
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), WalinkError> {
        self.db.checkpoint().await?;
        debug!("shutdown: WAL checkpoint complete");
        Ok(())
    }
}

#[async_trait]
impl MessageSink for SqliteMessageLog {
    async fn deliver(&self, message: &InboundMessage) -> Result<(), WalinkError> {
        let row = StoredMessage::from_inbound(message, Utc::now().to_rfc3339());
        let inserted = queries::insert_message(&self.db, &row).await?;
        debug!(message_id = %message.id, inserted, "message logged");
        Ok(())
    }
}
