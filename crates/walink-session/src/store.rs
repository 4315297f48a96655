// SPDX-FileCopyrightText: 2026 Walink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info};
use walink_core::{
    AdapterType, CredentialDelta, CredentialStore, HealthStatus, PluginAdapter,
    SessionCredential, WalinkError,
};

use crate::lock::DeviceLock;

const CURRENT_SCHEMA_VERSION: u32 = 1;

/// On-disk shape of a credential file.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedCredentials {
    schema_version: u32,
    device_id: String,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    entries: BTreeMap<String, serde_json::Value>,
}

/// Credential store writing `<dir>/<device_id>.json`.
///
/// All operations go through one async mutex, so writes are strictly ordered
/// and a reader never observes a half-applied delta.
#[derive(Debug)]
pub struct FileCredentialStore {
    device_id: String,
    path: PathBuf,
    /// `None` until the first load; always mirrors the last durable write.
    cache: Mutex<Option<SessionCredential>>,
    _lock: DeviceLock,
}

impl FileCredentialStore {
    /// Open the store for `device_id`, taking the device lock.
    pub async fn open(dir: impl AsRef<Path>, device_id: &str) -> Result<Self, WalinkError> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| {
            WalinkError::credential(
                format!("failed to create credentials directory {}", dir.display()),
                e,
            )
        })?;

        let lock = DeviceLock::acquire(&dir.join(format!("{device_id}.lock")))?;
        let path = dir.join(format!("{device_id}.json"));
        info!(device_id, path = %path.display(), "credential store opened");

        Ok(Self {
            device_id: device_id.to_string(),
            path,
            cache: Mutex::new(None),
            _lock: lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_persisted(&self) -> Result<SessionCredential, WalinkError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(device_id = %self.device_id, "no stored credentials; pairing required");
                return Ok(SessionCredential::default());
            }
            Err(e) => {
                return Err(WalinkError::credential(
                    format!("failed to read {}", self.path.display()),
                    e,
                ));
            }
        };

        if bytes.is_empty() {
            return Ok(SessionCredential::default());
        }

        let persisted: PersistedCredentials = serde_json::from_slice(&bytes).map_err(|e| {
            WalinkError::credential(format!("failed to parse {}", self.path.display()), e)
        })?;

        if persisted.schema_version > CURRENT_SCHEMA_VERSION {
            return Err(WalinkError::Credential {
                message: format!(
                    "unsupported credential schema version {} (max supported: {})",
                    persisted.schema_version, CURRENT_SCHEMA_VERSION
                ),
                source: None,
            });
        }

        Ok(SessionCredential::new(persisted.entries))
    }

    /// Write to a temp file, fsync it, then rename over the live file.
    async fn write_persisted(&self, credentials: &SessionCredential) -> Result<(), WalinkError> {
        let persisted = PersistedCredentials {
            schema_version: CURRENT_SCHEMA_VERSION,
            device_id: self.device_id.clone(),
            updated_at: Utc::now(),
            entries: credentials.entries().clone(),
        };
        let json = serde_json::to_vec_pretty(&persisted)
            .map_err(|e| WalinkError::credential("failed to serialize credentials", e))?;

        let tmp_path = self.path.with_file_name(format!(
            "{}.json.tmp.{}.{}",
            self.device_id,
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));

        let write = async {
            let mut file = tokio::fs::File::create(&tmp_path).await?;
            file.write_all(&json).await?;
            file.sync_all().await?;
            tokio::fs::rename(&tmp_path, &self.path).await
        };
        if let Err(e) = write.await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(WalinkError::credential(
                format!("failed to replace {}", self.path.display()),
                e,
            ));
        }

        // Persist the rename itself; failure here does not tear the file.
        if let Some(parent) = self.path.parent()
            && let Ok(dir) = tokio::fs::File::open(parent).await
            && let Err(e) = dir.sync_all().await
        {
            debug!(error = %e, "directory fsync failed");
        }

        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for FileCredentialStore {
    fn name(&self) -> &str {
        "file-credentials"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::CredentialStore
    }

    async fn health_check(&self) -> Result<HealthStatus, WalinkError> {
        match self.path.parent() {
            Some(dir) if tokio::fs::metadata(dir).await.is_ok() => Ok(HealthStatus::Healthy),
            _ => Ok(HealthStatus::Unhealthy(
                "credentials directory is missing".to_string(),
            )),
        }
    }

    async fn shutdown(&self) -> Result<(), WalinkError> {
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<SessionCredential, WalinkError> {
        let mut cache = self.cache.lock().await;
        let credentials = self.read_persisted().await?;
        *cache = Some(credentials.clone());
        Ok(credentials)
    }

    async fn save(&self, delta: CredentialDelta) -> Result<(), WalinkError> {
        let mut cache = self.cache.lock().await;
        let mut next = match cache.as_ref() {
            Some(current) => current.clone(),
            None => self.read_persisted().await?,
        };
        next.apply(&delta);
        self.write_persisted(&next).await?;
        debug!(device_id = %self.device_id, keys = delta.0.len(), "credentials persisted");
        *cache = Some(next);
        Ok(())
    }

    async fn clear(&self) -> Result<(), WalinkError> {
        let mut cache = self.cache.lock().await;
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(WalinkError::credential(
                    format!("failed to remove {}", self.path.display()),
                    e,
                ));
            }
        }
        *cache = Some(SessionCredential::default());
        info!(device_id = %self.device_id, "credentials cleared");
        Ok(())
    }
}
